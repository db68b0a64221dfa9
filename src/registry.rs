//registry.rs - every native operation the config language can call
//an entry matches on name, receiver type and the type of every argument.
//overloads are tried in the order they appear in NATIVE_OPS, first match wins.

use rand::Rng;

use crate::error::EvalError;
use crate::eval::EvalContext;
use crate::object::ObjectClassBuilder;
use crate::parser::VEC_CONSTRUCTOR;
use crate::special::Spring;
use crate::tracker::TrackedQuantity;
use crate::types::*;
use crate::vec2::Vec2;

pub type Handler = fn(&mut EvalContext<'_>, Option<&Value>, &[Value]) -> Result<Value, EvalError>;

pub struct NativeOp {
    pub name: &'static str,
    pub receiver: Option<ValueType>,
    pub params: &'static [ValueType],
    pub result: ValueType,
    pub invoke: Handler,
}

impl NativeOp {
    fn matches(&self, name: &str, receiver: Option<ValueType>, args: &[Value]) -> bool {
        self.name == name
            && self.receiver == receiver
            && self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(p, a)| *p == a.type_tag())
    }
}

pub fn resolve(name: &str, receiver: Option<ValueType>, args: &[Value]) -> Option<&'static NativeOp> {
    NATIVE_OPS.iter().find(|op| op.matches(name, receiver, args))
}

macro_rules! op {
    ($name:expr, $recv:expr, [$($param:ident),*], $result:ident, $handler:expr) => {
        NativeOp {
            name: $name,
            receiver: $recv,
            params: &[$(ValueType::$param),*],
            result: ValueType::$result,
            invoke: $handler,
        }
    };
}

const OBJECT: Option<ValueType> = Some(ValueType::Object);
const TRACKER: Option<ValueType> = Some(ValueType::Tracker);

static NATIVE_OPS: &[NativeOp] = &[
    op!("make_object", None, [Str, Number, Dict], Object, make_object),
    op!("make_spring", None, [Object, Object, Color, Number, Number], Empty, make_spring),
    op!("make_tracker", None, [Number, Number, Number], Tracker, make_tracker),
    op!("make_tracker", None, [Number, Number], Tracker, make_tracker),
    op!("track", TRACKER, [Object, Str, Color], Tracker, track),
    op!(VEC_CONSTRUCTOR, None, [Number, Number], Vector, make_vector),
    op!("random", None, [Number, Number], Number, random),
    //objtype declarations
    op!("@__cons_force_gravity", None, [Number], Empty, force_gravity),
    op!("@__cons_force_const_acc", None, [Number, Number], Empty, force_const_acc),
    op!("@__cons_force_const_acc", None, [Vector], Empty, force_const_acc),
    op!("@__cons_force_drag", None, [Number, Number], Empty, force_drag),
    op!("@__cons_force_field", None, [Number, Number], Empty, force_field),
    op!("@__cons_renderer_circle", None, [], Empty, renderer_circle),
    op!("@__cons_renderer_arrow_acc", None, [Number], Empty, renderer_arrow_acc),
    op!("@__cons_renderer_arrow_vel", None, [Number], Empty, renderer_arrow_vel),
    op!("@__cons_renderer_trail", None, [Number], Empty, renderer_trail),
    //engine settings
    op!("engine_cycles_per", None, [Number], Empty, engine_cycles_per),
    op!("engine_ticks_mult", None, [Number], Empty, engine_ticks_mult),
    //object setters, chainable
    op!("pos", OBJECT, [Number, Number], Object, set_pos),
    op!("pos", OBJECT, [Vector], Object, set_pos),
    op!("vel", OBJECT, [Number, Number], Object, set_vel),
    op!("vel", OBJECT, [Vector], Object, set_vel),
    op!("momentum", OBJECT, [Number, Number], Object, set_momentum),
    op!("momentum", OBJECT, [Vector], Object, set_momentum),
];

//argument helpers
//dispatch already checked the types, these only fail if a table entry and its handler disagree

fn bad_args(name: &str, args: &[Value]) -> EvalError {
    EvalError::NoOverload { name: name.to_string(), args: args.iter().map(Value::type_tag).collect() }
}

fn numbers<const N: usize>(name: &str, args: &[Value]) -> Result<[f64; N], EvalError> {
    if args.len() != N {
        return Err(bad_args(name, args));
    }
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_number().ok_or_else(|| bad_args(name, args))?;
    }
    Ok(out)
}

//(x, y) or a single vector
fn vector_arg(name: &str, args: &[Value]) -> Result<Vec2, EvalError> {
    match args {
        [Value::Vector(v)] => Ok(*v),
        [Value::Number(x), Value::Number(y)] => Ok(Vec2::new(*x, *y)),
        _ => Err(bad_args(name, args)),
    }
}

//negative and NaN become 0
fn count(n: f64) -> usize {
    n.max(0.0) as usize
}

fn builder<'c>(ctx: &'c mut EvalContext<'_>, what: &str) -> Result<&'c mut ObjectClassBuilder, EvalError> {
    ctx.builder.as_mut().ok_or_else(|| EvalError::OutsideObjType(what.to_string()))
}

//top level

fn make_object(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [Value::Str(class), Value::Number(mass), Value::Dict(init)] = args else {
        return Err(bad_args("make_object", args));
    };
    let handle = ctx.world.create_object(class, *mass, init)?;
    Ok(Value::Object(handle))
}

fn make_spring(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [Value::Object(a), Value::Object(b), Value::Color(color), Value::Number(k), Value::Number(len)] = args else {
        return Err(bad_args("make_spring", args));
    };
    ctx.world.add_special(Box::new(Spring::new(*a, *b, *color, *k, *len)));
    Ok(Value::Empty)
}

fn make_tracker(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let (sample_ticks, sample_n, width) = match args {
        [_, _, _] => {
            let [t, n, w] = numbers("make_tracker", args)?;
            (t, n, w)
        }
        _ => {
            let [t, n] = numbers("make_tracker", args)?;
            (t, n, 3.0)
        }
    };
    Ok(Value::Tracker(ctx.world.make_tracker(sample_ticks, count(sample_n), width)))
}

fn track(ctx: &mut EvalContext<'_>, recv: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let (Some(Value::Tracker(handle)), [Value::Object(obj), Value::Str(name), Value::Color(color)]) = (recv, args) else {
        return Err(bad_args("track", args));
    };
    let quantity = TrackedQuantity::parse(name).ok_or_else(|| EvalError::UnknownTrackedQuantity(name.clone()))?;
    ctx.world.tracker_mut(*handle)?.track(*obj, quantity, *color);
    Ok(Value::Tracker(*handle))
}

fn make_vector(_: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [x, y] = numbers("vector", args)?;
    Ok(Value::Vector(Vec2::new(x, y)))
}

fn random(_: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [min, max] = numbers("random", args)?;
    if !(min.is_finite() && max.is_finite() && (max - min).is_finite()) {
        return Err(EvalError::InvalidArgument { name: "random", reason: "bounds must be finite" });
    }
    let n = if max > min { rand::thread_rng().gen_range(min..max) } else { min };
    Ok(Value::Number(n))
}

//forces

fn force_gravity(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [g] = numbers("gravity", args)?;
    builder(ctx, "force gravity")?.gravity(g);
    Ok(Value::Empty)
}

fn force_const_acc(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let acc = vector_arg("const_acc", args)?;
    builder(ctx, "force const_acc")?.const_acc(acc);
    Ok(Value::Empty)
}

fn force_drag(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    if !ctx.world.config().drag_enabled {
        return Err(EvalError::DisabledForce("drag"));
    }
    let [k, power] = numbers("drag", args)?;
    builder(ctx, "force drag")?.drag(k, power);
    Ok(Value::Empty)
}

fn force_field(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [g, power] = numbers("field", args)?;
    builder(ctx, "force field")?.field(g, power);
    Ok(Value::Empty)
}

//renderers

fn renderer_circle(ctx: &mut EvalContext<'_>, _: Option<&Value>, _: &[Value]) -> Result<Value, EvalError> {
    builder(ctx, "renderer circle")?.circle();
    Ok(Value::Empty)
}

fn renderer_arrow_acc(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [scale] = numbers("arrow_acc", args)?;
    builder(ctx, "renderer arrow_acc")?.arrow_acc(scale);
    Ok(Value::Empty)
}

fn renderer_arrow_vel(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [scale] = numbers("arrow_vel", args)?;
    builder(ctx, "renderer arrow_vel")?.arrow_vel(scale);
    Ok(Value::Empty)
}

fn renderer_trail(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [min_dist] = numbers("trail", args)?;
    builder(ctx, "renderer trail")?.trail(min_dist);
    Ok(Value::Empty)
}

//engine

fn engine_cycles_per(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [n] = numbers("engine_cycles_per", args)?;
    ctx.world.set_cycles(count(n));
    Ok(Value::Empty)
}

fn engine_ticks_mult(ctx: &mut EvalContext<'_>, _: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    let [m] = numbers("engine_ticks_mult", args)?;
    ctx.world.set_tick_mult(m);
    Ok(Value::Empty)
}

//object setters

fn receiver_object(recv: Option<&Value>, name: &str, args: &[Value]) -> Result<ObjectHandle, EvalError> {
    match recv {
        Some(Value::Object(handle)) => Ok(*handle),
        _ => Err(bad_args(name, args)),
    }
}

fn set_body(
    ctx: &mut EvalContext<'_>,
    recv: Option<&Value>,
    name: &str,
    args: &[Value],
    apply: fn(&mut crate::object::Body, Vec2),
) -> Result<Value, EvalError> {
    let handle = receiver_object(recv, name, args)?;
    let v = vector_arg(name, args)?;
    if let Some(obj) = ctx.world.object_mut(handle) {
        apply(obj.body_mut(), v);
    }
    Ok(Value::Object(handle))
}

fn set_pos(ctx: &mut EvalContext<'_>, recv: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    set_body(ctx, recv, "pos", args, |body, v| body.set_pos(v))
}

fn set_vel(ctx: &mut EvalContext<'_>, recv: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    set_body(ctx, recv, "vel", args, |body, v| body.set_vel(v))
}

fn set_momentum(ctx: &mut EvalContext<'_>, recv: Option<&Value>, args: &[Value]) -> Result<Value, EvalError> {
    set_body(ctx, recv, "momentum", args, |body, p| body.set_momentum(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|n| Value::Number(*n)).collect()
    }

    #[test]
    fn pos_overloads_split_on_argument_shape() {
        let two = resolve("pos", OBJECT, &nums(&[600.0, 600.0])).unwrap();
        assert_eq!(two.params, &[ValueType::Number, ValueType::Number]);

        let one = resolve("pos", OBJECT, &[Value::Vector(Vec2::new(600.0, 600.0))]).unwrap();
        assert_eq!(one.params, &[ValueType::Vector]);

        assert!(resolve("pos", OBJECT, &nums(&[1.0, 2.0, 3.0])).is_none());
    }

    #[test]
    fn receiver_must_match() {
        assert!(resolve("pos", None, &nums(&[1.0, 2.0])).is_none());
        assert!(resolve("make_tracker", OBJECT, &nums(&[1.0, 2.0])).is_none());
        assert!(resolve("track", TRACKER, &[Value::Number(1.0)]).is_none());
    }

    #[test]
    fn no_coercion_between_types() {
        assert!(resolve("engine_cycles_per", None, &[Value::Str("3".into())]).is_none());
        assert!(resolve("random", None, &[Value::Number(1.0), Value::Empty]).is_none());
    }

    #[test]
    fn first_registered_overload_wins() {
        let op = resolve("make_tracker", None, &nums(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(op.params.len(), 3);
        assert_eq!(op.result, ValueType::Tracker);
    }

    #[test]
    fn count_saturates() {
        assert_eq!(count(-5.0), 0);
        assert_eq!(count(f64::NAN), 0);
        assert_eq!(count(7.9), 7);
    }
}
