//types.rs - core data types for phyconf
//this file holds the syntax tree, runtime values and draw commands.
//no complex logic here - just definitions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::lexer::SrcLocation;
use crate::vec2::Vec2;

//color - rgba, script colors are #RRGGBB with full alpha

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    //0xRRGGBB
    pub const fn from_packed_rgb(v: u32) -> Self {
        Self::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }
}

//handles - how scripts refer to things living in the world

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHandle(pub usize);

//trackers get replaced by make_tracker, the generation tells handles apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerHandle(pub usize);

pub type Dict = Arc<HashMap<String, Value>>;

//value - what variables and expressions hold

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Str(String),
    Color(Color),
    Vector(Vec2),
    Object(ObjectHandle),
    Tracker(TrackerHandle),
    Dict(Dict),
}

//runtime type tag, dispatch compares these and nothing else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Empty,
    Number,
    Str,
    Color,
    Vector,
    Object,
    Tracker,
    Dict,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Empty => "nothing",
            ValueType::Number => "number",
            ValueType::Str => "string",
            ValueType::Color => "color",
            ValueType::Vector => "vector",
            ValueType::Object => "object",
            ValueType::Tracker => "tracker",
            ValueType::Dict => "dictionary",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn type_tag(&self) -> ValueType {
        match self {
            Value::Empty => ValueType::Empty,
            Value::Number(_) => ValueType::Number,
            Value::Str(_) => ValueType::Str,
            Value::Color(_) => ValueType::Color,
            Value::Vector(_) => ValueType::Vector,
            Value::Object(_) => ValueType::Object,
            Value::Tracker(_) => ValueType::Tracker,
            Value::Dict(_) => ValueType::Dict,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

//exp - syntax tree nodes, every statement is one of these

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub fn from_char(c: char) -> Option<BinOp> {
        match c {
            '=' => Some(BinOp::Assign),
            '+' => Some(BinOp::Add),
            '-' => Some(BinOp::Sub),
            '*' => Some(BinOp::Mul),
            '/' => Some(BinOp::Div),
            '%' => Some(BinOp::Rem),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinOp::Assign => '=',
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Rem => '%',
        }
    }

    //assignment binds loosest, multiplicative tightest
    pub fn precedence(self) -> i32 {
        match self {
            BinOp::Assign => 100,
            BinOp::Add | BinOp::Sub => 200,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 400,
        }
    }

    pub fn right_assoc(self) -> bool {
        self == BinOp::Assign
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    LValue,
    RValue,
}

#[derive(Debug, Clone)]
pub enum Exp {
    Number(f64, SrcLocation),                      //literal number: 42
    Str(String, SrcLocation),                      //literal text: "hello"
    Color(u32, SrcLocation),                       //literal color: #ff0000
    Var(String, SrcLocation),                      //variable name: x
    BinaryOp(Box<Exp>, BinOp, Box<Exp>, SrcLocation), //math or assignment: a + b, a = b
    Call(String, Vec<Exp>, SrcLocation),           //function call: make_object(...)
    Dict(Vec<(String, Exp)>, SrcLocation),         //named args: {color: #fff, radius: 5}
    ObjType(ObjTypeDef),                           //objtype block
    Member(Box<Exp>, Box<Exp>, SrcLocation),       //method call: obj.pos(1, 2)
}

impl Exp {
    //only bare variables can be assigned to
    pub fn category(&self) -> ValueCategory {
        match self {
            Exp::Var(..) => ValueCategory::LValue,
            _ => ValueCategory::RValue,
        }
    }

    pub fn loc(&self) -> SrcLocation {
        match self {
            Exp::Number(_, l)
            | Exp::Str(_, l)
            | Exp::Color(_, l)
            | Exp::Var(_, l)
            | Exp::BinaryOp(_, _, _, l)
            | Exp::Call(_, _, l)
            | Exp::Dict(_, l)
            | Exp::Member(_, _, l) => *l,
            Exp::ObjType(def) => def.loc,
        }
    }
}

//objtype NAME control CTRL { force ...; renderer ...; }
//each declaration is stored as a call to the synthetic constructor
#[derive(Debug, Clone)]
pub struct ObjTypeDef {
    pub name: String,
    pub controller: String,
    pub forces: Vec<Exp>,
    pub renderers: Vec<Exp>,
    pub loc: SrcLocation,
}

pub type Program = Vec<Exp>;

//draw commands -> what the simulation hands to whoever renders it

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Circle { center: Vec2, radius: f64, color: Color },
    Line { from: Vec2, to: Vec2, color: Color, thickness: f32 },
    Polyline { points: Vec<Vec2>, color: Color },
    Triangle { points: [Vec2; 3], color: Color },
    Text { pos: Vec2, text: String, size: f32, color: Color },
}

//anything that accepts drawable primitives
//world-space shapes go through draw, screen-space overlays through draw_overlay
pub trait RenderTarget {
    fn draw(&mut self, cmd: DrawCmd);
    fn draw_overlay(&mut self, cmd: DrawCmd);
}

//in-memory target, the gui paints it and tests inspect it
#[derive(Debug, Default)]
pub struct Frame {
    pub world: Vec<DrawCmd>,
    pub overlay: Vec<DrawCmd>,
}

impl Frame {
    pub fn clear(&mut self) {
        self.world.clear();
        self.overlay.clear();
    }
}

impl RenderTarget for Frame {
    fn draw(&mut self, cmd: DrawCmd) {
        self.world.push(cmd);
    }

    fn draw_overlay(&mut self, cmd: DrawCmd) {
        self.overlay.push(cmd);
    }
}
