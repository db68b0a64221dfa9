//eval.rs - evaluates the syntax tree against a world
//evaluation never stops at the first problem: a failing node records a
//diagnostic, evaluates to Value::Empty and the next statement runs anyway.
//only after the whole pass does the caller decide whether to give up.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, trace};

use crate::error::{ConfigError, Diagnostic, EvalError};
use crate::lexer::SrcLocation;
use crate::movement::{DefaultController, MovementController, controller_by_name};
use crate::object::ObjectClassBuilder;
use crate::parser::{Parser, VEC_CONSTRUCTOR};
use crate::registry;
use crate::types::*;
use crate::world::World;

//state of one evaluation pass
pub struct EvalContext<'w> {
    vars: HashMap<String, Value>,
    errors: Vec<Diagnostic>,
    //only set while an objtype block is being evaluated
    pub(crate) builder: Option<ObjectClassBuilder>,
    pub(crate) world: &'w mut World,
}

impl<'w> EvalContext<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self { vars: HashMap::new(), errors: Vec::new(), builder: None, world }
    }

    pub fn error(&mut self, err: EvalError, loc: SrcLocation) {
        debug!(target: "phyconf::eval", "{}: {}", loc, err);
        self.errors.push(Diagnostic::new(err.to_string(), loc));
    }

    pub fn run(&mut self, program: &Program) {
        for statement in program {
            statement.eval(self, None);
        }
    }

    //ends the pass and releases the world
    pub fn finish(self) -> (HashMap<String, Value>, Vec<Diagnostic>) {
        (self.vars, self.errors)
    }
}

//how a call shows up in messages, synthetic names read like the source did
fn call_display_name(name: &str) -> String {
    if name == VEC_CONSTRUCTOR {
        return "[...]".to_string();
    }
    if let Some(kind) = name.strip_prefix("@__cons_force_") {
        return format!("force {}", kind);
    }
    if let Some(kind) = name.strip_prefix("@__cons_renderer_") {
        return format!("renderer {}", kind);
    }
    name.to_string()
}

impl Exp {
    //receiver is the value left of '.', only member access ever passes one down
    pub fn eval(&self, ctx: &mut EvalContext<'_>, receiver: Option<&Value>) -> Value {
        match self {
            //literals
            Exp::Number(n, _) => Value::Number(*n),
            Exp::Str(s, _) => Value::Str(s.clone()),
            Exp::Color(c, _) => Value::Color(Color::from_packed_rgb(*c)),

            //variables only live in the global scope, objects have no fields
            Exp::Var(name, loc) => {
                if receiver.is_some() {
                    ctx.error(EvalError::UnknownField(name.clone()), *loc);
                    return Value::Empty;
                }
                match ctx.vars.get(name) {
                    Some(v) => v.clone(),
                    None => {
                        ctx.error(EvalError::UndefinedVariable(name.clone()), *loc);
                        Value::Empty
                    }
                }
            }

            Exp::BinaryOp(lhs, BinOp::Assign, rhs, loc) => eval_assign(ctx, lhs, rhs, *loc),
            Exp::BinaryOp(lhs, op, rhs, _) => eval_arith(ctx, lhs, *op, rhs),

            Exp::Call(name, args, loc) => {
                let before = ctx.errors.len();
                //arguments never see the receiver of the call they belong to
                let values: Vec<Value> = args.iter().map(|a| a.eval(ctx, None)).collect();
                if ctx.errors.len() > before {
                    return Value::Empty;
                }

                let receiver_type = receiver.map(Value::type_tag);
                let Some(op) = registry::resolve(name, receiver_type, &values) else {
                    let err = EvalError::NoOverload {
                        name: call_display_name(name),
                        args: values.iter().map(Value::type_tag).collect(),
                    };
                    ctx.error(err, *loc);
                    return Value::Empty;
                };

                trace!(target: "phyconf::eval", "{} -> {}", op.name, op.result);
                match (op.invoke)(ctx, receiver, &values) {
                    Ok(v) => v,
                    Err(err) => {
                        ctx.error(err, *loc);
                        Value::Empty
                    }
                }
            }

            //values are evaluated right away, the map is shared from then on
            Exp::Dict(entries, _) => {
                let mut map = HashMap::with_capacity(entries.len());
                for (key, exp) in entries {
                    let v = exp.eval(ctx, None);
                    map.insert(key.clone(), v);
                }
                Value::Dict(Arc::new(map))
            }

            Exp::ObjType(def) => {
                eval_objtype(ctx, def);
                Value::Empty
            }

            Exp::Member(lhs, rhs, _) => {
                let before = ctx.errors.len();
                let target = lhs.eval(ctx, receiver);
                if ctx.errors.len() > before {
                    return Value::Empty;
                }
                rhs.eval(ctx, Some(&target))
            }
        }
    }
}

//first write fixes the type of a variable, later writes must match it
fn eval_assign(ctx: &mut EvalContext<'_>, lhs: &Exp, rhs: &Exp, loc: SrcLocation) -> Value {
    let (ValueCategory::LValue, Exp::Var(name, _)) = (lhs.category(), lhs) else {
        ctx.error(EvalError::ExpectedLvalue, lhs.loc());
        return Value::Empty;
    };

    let before = ctx.errors.len();
    let value = rhs.eval(ctx, None);
    if ctx.errors.len() > before {
        return Value::Empty;
    }

    if let Some(old) = ctx.vars.get(name) {
        if !old.is_empty() && old.type_tag() != value.type_tag() {
            let err = EvalError::AssignTypeMismatch {
                name: name.clone(),
                expected: old.type_tag(),
                found: value.type_tag(),
            };
            ctx.error(err, loc);
            return Value::Empty;
        }
    }

    ctx.vars.insert(name.clone(), value.clone());
    value
}

fn eval_arith(ctx: &mut EvalContext<'_>, lhs: &Exp, op: BinOp, rhs: &Exp) -> Value {
    let before = ctx.errors.len();
    let l = lhs.eval(ctx, None);
    let r = rhs.eval(ctx, None);
    if ctx.errors.len() > before {
        return Value::Empty;
    }

    let (Value::Number(l), Value::Number(r)) = (&l, &r) else {
        //point at the operand that is not a number
        let at = if matches!(l, Value::Number(_)) { rhs.loc() } else { lhs.loc() };
        ctx.error(
            EvalError::ArithmeticTypeMismatch { op: op.symbol(), lhs: l.type_tag(), rhs: r.type_tag() },
            at,
        );
        return Value::Empty;
    };

    let n = match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        BinOp::Rem => l % r,
        BinOp::Assign => unreachable!("assignment is handled by eval_assign"),
    };
    Value::Number(n)
}

fn eval_objtype(ctx: &mut EvalContext<'_>, def: &ObjTypeDef) {
    let controller: Box<dyn MovementController> = match controller_by_name(&def.controller, ctx.world.config()) {
        Some(c) => c,
        None => {
            ctx.error(EvalError::UnknownController(def.controller.clone()), def.loc);
            Box::new(DefaultController::new(ctx.world.config().max_velocity))
        }
    };

    let outer = ctx.builder.replace(ObjectClassBuilder::new(def.name.clone(), controller));
    for decl in def.forces.iter().chain(&def.renderers) {
        decl.eval(ctx, None);
    }
    //registered even if a declaration failed so later make_object calls don't pile on errors
    if let Some(builder) = ctx.builder.take() {
        builder.build(ctx.world);
    }
    ctx.builder = outer;
}

//runs a parsed program, returns everything that went wrong
pub fn evaluate(program: &Program, world: &mut World) -> Vec<Diagnostic> {
    let mut ctx = EvalContext::new(world);
    ctx.run(program);
    ctx.finish().1
}

fn report(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for d in diagnostics {
        eprint!("{}", d.render(filename, source));
    }
}

//source text -> configured world, all or nothing
pub fn create_world(source: &str, filename: &str, mut world: World) -> Result<World, ConfigError> {
    let mut parser = Parser::new(source);
    let program = parser.parse();
    if parser.had_errors() {
        let diagnostics = parser.into_diagnostics();
        report(&diagnostics, filename, source);
        error!(target: "phyconf", "{} error(s) while parsing {}", diagnostics.len(), filename);
        return Err(ConfigError::Parse(diagnostics.len()));
    }

    let errors = evaluate(&program, &mut world);
    if !errors.is_empty() {
        report(&errors, filename, source);
        error!(target: "phyconf", "{} error(s) while evaluating {}", errors.len(), filename);
        return Err(ConfigError::Eval(errors.len()));
    }

    info!(
        target: "phyconf",
        "loaded {}: {} object type(s), {} object(s), {} special(s)",
        filename,
        world.class_count(),
        world.objects().len(),
        world.special_count()
    );
    Ok(world)
}
