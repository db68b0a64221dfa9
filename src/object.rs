//object.rs - component based object model
//an ObjectClass is a frozen bundle of force/renderer components plus one
//movement controller. every Object of that class owns a slot storage array
//whose layout (how many slots, which kind each) the class decided at build time.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ObjectError;
use crate::forces::{ConstAcc, Drag, Force, Gravity, SimpleField};
use crate::movement::MovementController;
use crate::renderers::{ArrowKind, ArrowRenderer, ArrowShape, CircleRenderer, CircleShape, Renderer, TrailPath, TrailRenderer};
use crate::types::*;
use crate::vec2::Vec2;
use crate::world::World;

//slots

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Color,
    Circle,
    Arrow,
    Trail,
}

//what one storage slot of an object holds
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Vacant,
    Color(Color),
    Circle(CircleShape),
    Arrow(ArrowShape),
    Trail(TrailPath),
}

//types that can live in a slot
pub trait SlotType: Sized {
    const KIND: SlotKind;
    fn wrap(self) -> SlotValue;
    fn peek(value: &SlotValue) -> Option<&Self>;
    fn peek_mut(value: &mut SlotValue) -> Option<&mut Self>;
}

macro_rules! slot_type {
    ($ty:ty, $variant:ident) => {
        impl SlotType for $ty {
            const KIND: SlotKind = SlotKind::$variant;

            fn wrap(self) -> SlotValue {
                SlotValue::$variant(self)
            }

            fn peek(value: &SlotValue) -> Option<&Self> {
                match value {
                    SlotValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn peek_mut(value: &mut SlotValue) -> Option<&mut Self> {
                match value {
                    SlotValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

slot_type!(Color, Color);
slot_type!(CircleShape, Circle);
slot_type!(ArrowShape, Arrow);
slot_type!(TrailPath, Trail);

//typed index into a SlotStorage
pub struct Slot<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Slot({})", self.index)
    }
}

impl<T: SlotType> Slot<T> {
    fn new(index: usize) -> Self {
        Self { index, _marker: PhantomData }
    }

    #[cfg(test)]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get<'a>(&self, storage: &'a SlotStorage) -> Option<&'a T> {
        storage.values.get(self.index).and_then(T::peek)
    }

    pub fn get_mut<'a>(&self, storage: &'a mut SlotStorage) -> Option<&'a mut T> {
        storage.values.get_mut(self.index).and_then(T::peek_mut)
    }

    //refuses to put a value into a slot registered for another kind
    pub fn write(&self, storage: &mut SlotStorage, value: T) -> Result<(), ObjectError> {
        if storage.kinds.get(self.index) != Some(&T::KIND) {
            return Err(ObjectError::SlotKindMismatch { index: self.index });
        }
        storage.values[self.index] = value.wrap();
        Ok(())
    }
}

//builder side: hands out slot indices while components are added
//anonymous requests always get a fresh slot, named ones share
#[derive(Debug, Default)]
pub struct SlotRegistry {
    names: HashMap<&'static str, usize>,
    kinds: Vec<SlotKind>,
}

impl SlotRegistry {
    pub fn alloc<T: SlotType>(&mut self, key: Option<&'static str>) -> Slot<T> {
        if let Some(key) = key {
            if let Some(&index) = self.names.get(key) {
                debug_assert_eq!(self.kinds[index], T::KIND, "slot `{}` requested with two kinds", key);
                return Slot::new(index);
            }
        }

        let index = self.kinds.len();
        self.kinds.push(T::KIND);
        if let Some(key) = key {
            self.names.insert(key, index);
        }
        Slot::new(index)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }
}

//per instance storage, lives exactly as long as its object
#[derive(Debug)]
pub struct SlotStorage {
    kinds: Arc<[SlotKind]>,
    values: Vec<SlotValue>,
}

impl SlotStorage {
    pub fn new(kinds: Arc<[SlotKind]>) -> Self {
        let values = vec![SlotValue::Vacant; kinds.len()];
        Self { kinds, values }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    pub fn value(&self, index: usize) -> Option<&SlotValue> {
        self.values.get(index)
    }
}

//named initialisation values handed to make_object

pub type InitValues = HashMap<String, Value>;

pub trait FromInitValue: Sized {
    const TYPE: ValueType;
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromInitValue for Color {
    const TYPE: ValueType = ValueType::Color;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl FromInitValue for f64 {
    const TYPE: ValueType = ValueType::Number;
    fn from_value(value: &Value) -> Option<Self> {
        value.as_number()
    }
}

//a fixed key components look up in the init dictionary
pub struct InitKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromInitValue> InitKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    pub fn at(&self, init: &InitValues) -> Result<T, ObjectError> {
        let value = init.get(self.name).ok_or(ObjectError::MissingKey(self.name))?;
        T::from_value(value).ok_or(ObjectError::WrongKeyType {
            key: self.name,
            expected: T::TYPE,
            found: value.type_tag(),
        })
    }
}

//object class

pub struct ObjectClass {
    name: String,
    forces: Vec<Box<dyn Force>>,
    renderers: Vec<Box<dyn Renderer>>,
    controller: Box<dyn MovementController>,
    slot_kinds: Arc<[SlotKind]>,
}

impl ObjectClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot_count(&self) -> usize {
        self.slot_kinds.len()
    }

    pub fn force_count(&self) -> usize {
        self.forces.len()
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    //renderers fill their slots in registration order
    fn init_object(&self, slots: &mut SlotStorage, init: &InitValues) -> Result<(), ObjectError> {
        for renderer in &self.renderers {
            renderer.init(slots, init)?;
        }
        Ok(())
    }
}

//single use: build() consumes it, so nothing can be added afterwards
pub struct ObjectClassBuilder {
    name: String,
    controller: Box<dyn MovementController>,
    forces: Vec<Box<dyn Force>>,
    renderers: Vec<Box<dyn Renderer>>,
    slots: SlotRegistry,
}

impl ObjectClassBuilder {
    pub fn new(name: impl Into<String>, controller: Box<dyn MovementController>) -> Self {
        Self {
            name: name.into(),
            controller,
            forces: Vec::new(),
            renderers: Vec::new(),
            slots: SlotRegistry::default(),
        }
    }

    pub fn force(&mut self, force: impl Force + 'static) -> &mut Self {
        self.forces.push(Box::new(force));
        self
    }

    pub fn gravity(&mut self, constant: f64) -> &mut Self {
        self.force(Gravity::new(constant))
    }

    pub fn const_acc(&mut self, acc: Vec2) -> &mut Self {
        self.force(ConstAcc::new(acc))
    }

    pub fn drag(&mut self, drag_const: f64, power: f64) -> &mut Self {
        self.force(Drag::new(drag_const, power))
    }

    pub fn field(&mut self, constant: f64, power: f64) -> &mut Self {
        self.force(SimpleField::new(constant, power))
    }

    //the renderer gets to allocate its slots while being constructed
    pub fn renderer<R: Renderer + 'static>(&mut self, make: impl FnOnce(&mut SlotRegistry) -> R) -> &mut Self {
        let renderer = make(&mut self.slots);
        self.renderers.push(Box::new(renderer));
        self
    }

    pub fn circle(&mut self) -> &mut Self {
        self.renderer(CircleRenderer::new)
    }

    pub fn trail(&mut self, min_dist: f64) -> &mut Self {
        self.renderer(|slots| TrailRenderer::new(slots, min_dist))
    }

    pub fn arrow_vel(&mut self, scale: f64) -> &mut Self {
        self.renderer(|slots| ArrowRenderer::new(slots, ArrowKind::Velocity, scale))
    }

    pub fn arrow_acc(&mut self, scale: f64) -> &mut Self {
        self.renderer(|slots| ArrowRenderer::new(slots, ArrowKind::Acceleration, scale))
    }

    pub(crate) fn finish(self) -> ObjectClass {
        ObjectClass {
            name: self.name,
            forces: self.forces,
            renderers: self.renderers,
            controller: self.controller,
            slot_kinds: self.slots.kinds.into(),
        }
    }

    //freeze and register under the class name
    pub fn build(self, world: &mut World) {
        world.add_class(self.finish());
    }
}

//object instance

//current state is what everyone reads during a tick, pending is what the
//controller writes; commit() swaps them for the whole population at once
#[derive(Debug, Clone, Default)]
pub struct Body {
    mass: f64,
    acc: Vec2,
    vel: Vec2,
    pos: Vec2,
    new_acc: Vec2,
    new_vel: Vec2,
    new_pos: Vec2,
}

impl Body {
    pub fn new(mass: f64) -> Self {
        Self { mass: if mass > 0.0 { mass } else { 1.0 }, ..Default::default() }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }
    pub fn pos(&self) -> Vec2 {
        self.pos
    }
    pub fn vel(&self) -> Vec2 {
        self.vel
    }
    pub fn acc(&self) -> Vec2 {
        self.acc
    }
    #[cfg(test)]
    pub fn new_pos(&self) -> Vec2 {
        self.new_pos
    }
    #[cfg(test)]
    pub fn new_vel(&self) -> Vec2 {
        self.new_vel
    }
    #[cfg(test)]
    pub fn new_acc(&self) -> Vec2 {
        self.new_acc
    }

    pub fn momentum(&self) -> Vec2 {
        self.vel * self.mass
    }

    //setters used by scripts write both buffers
    pub fn set_pos(&mut self, v: Vec2) {
        self.pos = v;
        self.new_pos = v;
    }
    pub fn set_vel(&mut self, v: Vec2) {
        self.vel = v;
        self.new_vel = v;
    }
    #[cfg(test)]
    pub fn set_acc(&mut self, v: Vec2) {
        self.acc = v;
        self.new_acc = v;
    }
    pub fn set_momentum(&mut self, p: Vec2) {
        self.set_vel(p / self.mass);
    }

    pub fn set_new_pos(&mut self, v: Vec2) {
        self.new_pos = v;
    }
    pub fn set_new_vel(&mut self, v: Vec2) {
        self.new_vel = v;
    }
    pub fn set_new_acc(&mut self, v: Vec2) {
        self.new_acc = v;
    }

    pub fn commit(&mut self) {
        self.acc = self.new_acc;
        self.vel = self.new_vel;
        self.pos = self.new_pos;
    }
}

pub struct Object {
    id: usize,
    class: Arc<ObjectClass>,
    body: Body,
    slots: SlotStorage,
}

impl Object {
    pub fn new(id: usize, class: Arc<ObjectClass>, mass: f64, init: &InitValues) -> Result<Self, ObjectError> {
        let mut slots = SlotStorage::new(class.slot_kinds.clone());
        class.init_object(&mut slots, init)?;
        Ok(Self { id, class, body: Body::new(mass), slots })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn class(&self) -> &ObjectClass {
        &self.class
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    #[cfg(test)]
    pub fn slots(&self) -> &SlotStorage {
        &self.slots
    }

    //force this object's components put on it because of `other`
    pub fn apply_force(&self, other: &Object) -> Vec2 {
        let mut total = Vec2::ZERO;
        for force in &self.class.forces {
            total += force.compute_force(self, other);
        }
        total
    }

    pub fn integrate(&mut self, dt: f64, force: Vec2) {
        self.class.controller.update(&mut self.body, dt, force);
    }

    //commit, then let presentation state catch up
    pub fn step_time(&mut self) {
        self.body.commit();
        for renderer in &self.class.renderers {
            renderer.update_phase(&self.body, &mut self.slots);
        }
    }

    pub fn render(&self, target: &mut dyn RenderTarget) {
        for renderer in &self.class.renderers {
            renderer.render_phase(&self.body, &self.slots, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::DefaultController;

    fn builder(name: &str) -> ObjectClassBuilder {
        ObjectClassBuilder::new(name, Box::new(DefaultController::default()))
    }

    fn init(pairs: &[(&str, Value)]) -> InitValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn anonymous_slots_are_fresh_named_slots_shared() {
        let mut slots = SlotRegistry::default();
        let a: Slot<Color> = slots.alloc(None);
        let b: Slot<Color> = slots.alloc(None);
        let c: Slot<Color> = slots.alloc(Some("color"));
        let d: Slot<Color> = slots.alloc(Some("color"));
        assert_ne!(a.index(), b.index());
        assert_eq!(c.index(), d.index());
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn arrows_share_one_color_slot_but_not_shapes() {
        let mut b = builder("arrows");
        b.arrow_vel(1.0).arrow_acc(2.0);
        let class = b.finish();
        //two shape slots plus one shared color slot
        assert_eq!(class.slot_count(), 3);
    }

    #[test]
    fn write_through_one_read_through_other() {
        let mut registry = SlotRegistry::default();
        let first: Slot<Color> = registry.alloc(Some("color"));
        let second: Slot<Color> = registry.alloc(Some("color"));
        let mut storage = SlotStorage::new(registry.kinds.clone().into());

        first.write(&mut storage, Color::rgb(1, 2, 3)).unwrap();
        assert_eq!(second.get(&storage), Some(&Color::rgb(1, 2, 3)));
        if let Some(c) = second.get_mut(&mut storage) {
            c.r = 9;
        }
        assert_eq!(first.get(&storage).map(|c| c.r), Some(9));
    }

    #[test]
    fn slot_refuses_foreign_kind() {
        let mut registry = SlotRegistry::default();
        let _color: Slot<Color> = registry.alloc(None);
        let mut storage = SlotStorage::new(registry.kinds.clone().into());
        let wrong: Slot<CircleShape> = Slot::new(0);
        let shape = CircleShape { radius: 1.0, color: Color::WHITE };
        assert_eq!(wrong.write(&mut storage, shape), Err(ObjectError::SlotKindMismatch { index: 0 }));
    }

    #[test]
    fn missing_init_key_fails_construction() {
        let mut b = builder("ball");
        b.circle();
        let class = Arc::new(b.finish());
        let err = Object::new(0, class, 1.0, &init(&[("color", Value::Color(Color::WHITE))]))
            .err()
            .unwrap();
        assert_eq!(err, ObjectError::MissingKey("radius"));
    }

    #[test]
    fn wrong_init_type_is_reported() {
        let mut b = builder("ball");
        b.circle();
        let class = Arc::new(b.finish());
        let values = init(&[("color", Value::Number(3.0)), ("radius", Value::Number(2.0))]);
        let err = Object::new(0, class, 1.0, &values).err().unwrap();
        assert_eq!(
            err,
            ObjectError::WrongKeyType { key: "color", expected: ValueType::Color, found: ValueType::Number }
        );
    }

    #[test]
    fn non_positive_mass_becomes_one() {
        assert_eq!(Body::new(0.0).mass(), 1.0);
        assert_eq!(Body::new(-4.0).mass(), 1.0);
        assert_eq!(Body::new(2.5).mass(), 2.5);
    }

    #[test]
    fn momentum_sets_velocity_by_mass() {
        let mut body = Body::new(4.0);
        body.set_momentum(Vec2::new(8.0, -4.0));
        assert_eq!(body.vel(), Vec2::new(2.0, -1.0));
        assert_eq!(body.new_vel(), Vec2::new(2.0, -1.0));
    }

    #[test]
    fn slots_filled_at_construction() {
        let mut b = builder("ball");
        b.circle().trail(1.0);
        let class = Arc::new(b.finish());
        let values = init(&[
            ("color", Value::Color(Color::WHITE)),
            ("radius", Value::Number(3.0)),
            ("trail_color", Value::Color(Color::rgb(0, 255, 0))),
        ]);
        let obj = Object::new(0, class, 1.0, &values).unwrap();
        for i in 0..obj.slots().len() {
            assert_ne!(obj.slots().value(i), Some(&SlotValue::Vacant));
        }
    }
}
