//special.rs - simulation participants outside the class model
//they address objects by handle and push forces straight into the
//per-object accumulator of the current tick

use crate::object::Object;
use crate::types::*;
use crate::vec2::Vec2;

pub trait SpecialObject {
    fn apply_forces(&self, objects: &[Object], forces: &mut [Vec2]);
    fn step_time(&mut self, _objects: &[Object]) {}
    fn render(&self, objects: &[Object], target: &mut dyn RenderTarget);
}

//hooke spring between two objects
pub struct Spring {
    a: ObjectHandle,
    b: ObjectHandle,
    color: Color,
    spring_const: f64,
    relaxed_len: f64,
}

impl Spring {
    pub fn new(a: ObjectHandle, b: ObjectHandle, color: Color, spring_const: f64, relaxed_len: f64) -> Self {
        Self { a, b, color, spring_const, relaxed_len }
    }

    fn ends<'a>(&self, objects: &'a [Object]) -> Option<(&'a Object, &'a Object)> {
        Some((objects.get(self.a.0)?, objects.get(self.b.0)?))
    }
}

impl SpecialObject for Spring {
    fn apply_forces(&self, objects: &[Object], forces: &mut [Vec2]) {
        let Some((a, b)) = self.ends(objects) else { return };
        let disp = a.body().pos() - b.body().pos();
        //positive when stretched, pulls the ends together
        let stretch = (disp.magnitude() - self.relaxed_len) * self.spring_const;
        let dir = disp.normalize();
        forces[self.a.0] += -dir * stretch;
        forces[self.b.0] += dir * stretch;
    }

    fn render(&self, objects: &[Object], target: &mut dyn RenderTarget) {
        let Some((a, b)) = self.ends(objects) else { return };
        target.draw(DrawCmd::Line { from: a.body().pos(), to: b.body().pos(), color: self.color, thickness: 1.5 });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::movement::DefaultController;
    use crate::object::{InitValues, ObjectClassBuilder};

    fn pair(distance: f64) -> Vec<Object> {
        let class = Arc::new(ObjectClassBuilder::new("bead", Box::new(DefaultController::default())).finish());
        let mut objects = Vec::new();
        for (id, x) in [0.0, distance].into_iter().enumerate() {
            let mut obj = Object::new(id, class.clone(), 1.0, &InitValues::new()).unwrap();
            obj.body_mut().set_pos(Vec2::new(x, 0.0));
            objects.push(obj);
        }
        objects
    }

    #[test]
    fn stretched_spring_pulls_ends_together() {
        let objects = pair(12.0);
        let spring = Spring::new(ObjectHandle(0), ObjectHandle(1), Color::WHITE, 2.0, 10.0);
        let mut forces = vec![Vec2::ZERO; 2];
        spring.apply_forces(&objects, &mut forces);
        assert_eq!(forces[0], Vec2::new(4.0, 0.0));
        assert_eq!(forces[1], Vec2::new(-4.0, 0.0));
    }

    #[test]
    fn compressed_spring_pushes_apart() {
        let objects = pair(5.0);
        let spring = Spring::new(ObjectHandle(0), ObjectHandle(1), Color::WHITE, 1.0, 10.0);
        let mut forces = vec![Vec2::ZERO; 2];
        spring.apply_forces(&objects, &mut forces);
        assert!(forces[0].x < 0.0);
        assert!(forces[1].x > 0.0);
        assert_eq!(forces[0] + forces[1], Vec2::ZERO);
    }

    #[test]
    fn spring_draws_line_between_ends() {
        let objects = pair(3.0);
        let spring = Spring::new(ObjectHandle(0), ObjectHandle(1), Color::rgb(1, 2, 3), 1.0, 1.0);
        let mut frame = Frame::default();
        spring.render(&objects, &mut frame);
        assert_eq!(
            frame.world,
            vec![DrawCmd::Line {
                from: Vec2::ZERO,
                to: Vec2::new(3.0, 0.0),
                color: Color::rgb(1, 2, 3),
                thickness: 1.5
            }]
        );
    }
}
