//movement.rs - movement controllers
//a controller reads the current state of a body and writes its pending state,
//the world commits pending state for everyone after the integration pass

use tracing::warn;

use crate::object::Body;
use crate::vec2::Vec2;
use crate::world::SimConfig;

pub const DEFAULT_MAX_VELOCITY: f64 = 1e6;

//a single step changing velocity by more than this is most likely a blow-up
pub const VELOCITY_DELTA_WARN: f64 = 750.0;

pub trait MovementController {
    fn update(&self, body: &mut Body, dt: f64, force: Vec2);
}

//semi-implicit euler with a velocity ceiling
pub struct DefaultController {
    max_velocity: f64,
}

impl DefaultController {
    pub fn new(max_velocity: f64) -> Self {
        Self { max_velocity }
    }
}

impl Default for DefaultController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VELOCITY)
    }
}

impl MovementController for DefaultController {
    fn update(&self, body: &mut Body, dt: f64, force: Vec2) {
        let new_acc = force / body.mass();
        let new_pos = body.pos() + body.vel() * dt;
        let mut new_vel = body.vel() + body.acc() * dt;

        let dv = (new_vel - body.vel()).magnitude();
        if dv > VELOCITY_DELTA_WARN {
            warn!(target: "movement::default", "velocity changed by {:.1} in one step, dt={}", dv, dt);
        }

        if !new_vel.is_finite() {
            warn!(target: "movement::default", "velocity became {}, stopping the object", new_vel);
            new_vel = Vec2::ZERO;
        }

        let speed = new_vel.magnitude();
        if speed > self.max_velocity {
            warn!(target: "movement::default", "velocity {:.1} above ceiling {}, clamping", speed, self.max_velocity);
            new_vel = new_vel.with_magnitude(self.max_velocity);
        }

        body.set_new_acc(new_acc);
        body.set_new_pos(new_pos);
        body.set_new_vel(new_vel);
    }
}

//pinned in place, ignores every force
pub struct FixedController;

impl MovementController for FixedController {
    fn update(&self, body: &mut Body, _dt: f64, _force: Vec2) {
        body.set_new_pos(body.pos());
        body.set_new_vel(Vec2::ZERO);
        body.set_new_acc(Vec2::ZERO);
    }
}

pub fn controller_by_name(name: &str, config: &SimConfig) -> Option<Box<dyn MovementController>> {
    match name {
        "default" => Some(Box::new(DefaultController::new(config.max_velocity))),
        "fixed" => Some(Box::new(FixedController)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_uses_old_state() {
        let mut body = Body::new(2.0);
        body.set_pos(Vec2::new(1.0, 0.0));
        body.set_vel(Vec2::new(2.0, 0.0));
        body.set_acc(Vec2::new(0.0, 4.0));

        DefaultController::default().update(&mut body, 0.5, Vec2::new(6.0, 0.0));
        assert_eq!(body.new_acc(), Vec2::new(3.0, 0.0));
        assert_eq!(body.new_pos(), Vec2::new(2.0, 0.0));
        assert_eq!(body.new_vel(), Vec2::new(2.0, 2.0));
        //current state untouched until commit
        assert_eq!(body.pos(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn velocity_is_clamped_to_ceiling() {
        let mut body = Body::new(1.0);
        body.set_vel(Vec2::new(0.0, 90.0));
        body.set_acc(Vec2::new(0.0, 100.0));
        DefaultController::new(50.0).update(&mut body, 1.0, Vec2::ZERO);
        assert!((body.new_vel().magnitude() - 50.0).abs() < 1e-9);
        assert!(body.new_vel().y > 0.0);
    }

    #[test]
    fn fixed_never_moves() {
        let mut body = Body::new(1.0);
        body.set_pos(Vec2::new(3.0, 3.0));
        body.set_vel(Vec2::new(1.0, 1.0));
        FixedController.update(&mut body, 1.0, Vec2::new(100.0, 0.0));
        body.commit();
        assert_eq!(body.pos(), Vec2::new(3.0, 3.0));
        assert_eq!(body.vel(), Vec2::ZERO);
        assert_eq!(body.acc(), Vec2::ZERO);
    }

    #[test]
    fn controllers_by_name() {
        let config = SimConfig::default();
        assert!(controller_by_name("default", &config).is_some());
        assert!(controller_by_name("fixed", &config).is_some());
        assert!(controller_by_name("wobbly", &config).is_none());
    }
}
