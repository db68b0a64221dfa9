//forces.rs - force components
//compute_force(that, other) is the force `other` exerts on `that`.
//it is called for every ordered pair including (a, a), pairwise forces
//skip the self pair and per-object forces only answer it.

use tracing::warn;

use crate::object::Object;
use crate::vec2::Vec2;

//closer than this and gravity-like forces pretend the bodies are this far apart
pub const DISTANCE_FLOOR: f64 = 0.1;

pub trait Force {
    fn compute_force(&self, that: &Object, other: &Object) -> Vec2;
}

fn same(that: &Object, other: &Object) -> bool {
    that.id() == other.id()
}

//displacement from other to that, stretched to the floor when too short
fn clamped_displacement(that: &Object, other: &Object) -> Vec2 {
    let dist = that.body().pos() - other.body().pos();
    let len = dist.magnitude();
    if len < DISTANCE_FLOOR {
        warn!(
            target: "force::gravity",
            "objects {} and {} are {:.4} apart, clamping to {}",
            that.id(),
            other.id(),
            len,
            DISTANCE_FLOOR
        );
        return dist.with_magnitude(DISTANCE_FLOOR);
    }
    dist
}

//attracts every other object, G*m1*m2/r^2
pub struct Gravity {
    constant: f64,
}

impl Gravity {
    pub fn new(constant: f64) -> Self {
        Self { constant }
    }
}

impl Force for Gravity {
    fn compute_force(&self, that: &Object, other: &Object) -> Vec2 {
        if same(that, other) {
            return Vec2::ZERO;
        }
        let dist = clamped_displacement(that, other);
        let r = dist.magnitude().max(DISTANCE_FLOOR);
        let strength = self.constant * that.body().mass() * other.body().mass() / (r * r);
        -dist.normalize() * strength
    }
}

//G*m1*m2*r^-power, the field gravity would be with power 2
pub struct SimpleField {
    constant: f64,
    power: f64,
}

impl SimpleField {
    pub fn new(constant: f64, power: f64) -> Self {
        Self { constant, power }
    }
}

impl Force for SimpleField {
    fn compute_force(&self, that: &Object, other: &Object) -> Vec2 {
        if same(that, other) {
            return Vec2::ZERO;
        }
        let dist = that.body().pos() - other.body().pos();
        let r = dist.magnitude();
        //near-coincident pairs are skipped, not clamped
        if r < DISTANCE_FLOOR {
            return Vec2::ZERO;
        }
        let strength = self.constant * that.body().mass() * other.body().mass() * r.powf(-self.power);
        -dist.normalize() * strength
    }
}

//opposes own velocity, k*|v|^power
pub struct Drag {
    drag_const: f64,
    power: f64,
}

impl Drag {
    pub fn new(drag_const: f64, power: f64) -> Self {
        Self { drag_const, power }
    }
}

impl Force for Drag {
    fn compute_force(&self, that: &Object, other: &Object) -> Vec2 {
        if !same(that, other) {
            return Vec2::ZERO;
        }
        let vel = that.body().vel();
        -vel.normalize() * (vel.magnitude().powf(self.power) * self.drag_const)
    }
}

//uniform acceleration, e.g. surface gravity
pub struct ConstAcc {
    acc: Vec2,
}

impl ConstAcc {
    pub fn new(acc: Vec2) -> Self {
        Self { acc }
    }
}

impl Force for ConstAcc {
    fn compute_force(&self, that: &Object, other: &Object) -> Vec2 {
        if !same(that, other) {
            return Vec2::ZERO;
        }
        self.acc * that.body().mass()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::movement::DefaultController;
    use crate::object::{InitValues, ObjectClass, ObjectClassBuilder};

    fn bare_class() -> Arc<ObjectClass> {
        Arc::new(ObjectClassBuilder::new("bare", Box::new(DefaultController::default())).finish())
    }

    fn object_at(id: usize, mass: f64, pos: Vec2) -> Object {
        let mut obj = Object::new(id, bare_class(), mass, &InitValues::new()).unwrap();
        obj.body_mut().set_pos(pos);
        obj
    }

    #[test]
    fn gravity_pulls_towards_other() {
        let a = object_at(0, 2.0, Vec2::new(0.0, 0.0));
        let b = object_at(1, 3.0, Vec2::new(2.0, 0.0));
        let f = Gravity::new(1.0).compute_force(&a, &b);
        assert!((f.x - 1.5).abs() < 1e-12);
        assert_eq!(f.y, 0.0);
        assert_eq!(Gravity::new(1.0).compute_force(&a, &a), Vec2::ZERO);
    }

    #[test]
    fn near_singular_gravity_uses_floor_distance() {
        let a = object_at(0, 1.0, Vec2::new(0.0, 0.0));
        let near = object_at(1, 1.0, Vec2::new(1e-9, 0.0));
        let at_floor = object_at(2, 1.0, Vec2::new(DISTANCE_FLOOR, 0.0));

        let g = Gravity::new(5.0);
        let f_near = g.compute_force(&a, &near);
        let f_floor = g.compute_force(&a, &at_floor);
        assert!(f_near.is_finite());
        assert!((f_near.magnitude() - f_floor.magnitude()).abs() < 1e-9);
    }

    #[test]
    fn coincident_objects_feel_nothing() {
        let a = object_at(0, 1.0, Vec2::new(4.0, 4.0));
        let b = object_at(1, 1.0, Vec2::new(4.0, 4.0));
        let f = Gravity::new(1.0).compute_force(&a, &b);
        assert_eq!(f, Vec2::ZERO);
    }

    #[test]
    fn const_acc_scales_with_mass_on_self_only() {
        let a = object_at(0, 4.0, Vec2::ZERO);
        let b = object_at(1, 1.0, Vec2::new(1.0, 0.0));
        let force = ConstAcc::new(Vec2::new(0.0, -10.0));
        assert_eq!(force.compute_force(&a, &a), Vec2::new(0.0, -40.0));
        assert_eq!(force.compute_force(&a, &b), Vec2::ZERO);
    }

    #[test]
    fn drag_opposes_velocity() {
        let mut a = object_at(0, 1.0, Vec2::ZERO);
        a.body_mut().set_vel(Vec2::new(3.0, 4.0));
        let f = Drag::new(0.5, 2.0).compute_force(&a, &a);
        //|v| = 5, 0.5 * 25 along -v
        assert!((f.x + 7.5).abs() < 1e-12);
        assert!((f.y + 10.0).abs() < 1e-12);
    }

    #[test]
    fn field_with_power_two_matches_gravity() {
        let a = object_at(0, 2.0, Vec2::new(0.0, 0.0));
        let b = object_at(1, 3.0, Vec2::new(0.0, 3.0));
        let g = Gravity::new(1.5).compute_force(&a, &b);
        let f = SimpleField::new(1.5, 2.0).compute_force(&a, &b);
        assert!((g - f).magnitude() < 1e-12);
    }
}
