//renderers.rs - drawing components of an object class
//a renderer keeps its presentation state in the object's slots:
//init fills them from make_object's dictionary, update_phase runs after every
//committed step and render_phase turns them into draw commands.

use std::collections::VecDeque;

use crate::error::ObjectError;
use crate::object::{InitKey, InitValues, Slot, SlotRegistry, SlotStorage};
use crate::object::Body;
use crate::types::*;
use crate::vec2::Vec2;

//dictionary keys make_object understands
pub const COLOR: InitKey<Color> = InitKey::new("color");
pub const RADIUS: InitKey<f64> = InitKey::new("radius");
pub const TRAIL_COLOR: InitKey<Color> = InitKey::new("trail_color");
pub const ARROW_COLOR: InitKey<Color> = InitKey::new("arrow_color");

//velocity and acceleration arrows of one object share this slot
pub const ARROW_COLOR_SLOT: &str = "arrow_color";

//oldest points are dropped past this
pub const TRAIL_CAP: usize = 10_000;

pub trait Renderer {
    fn init(&self, slots: &mut SlotStorage, init: &InitValues) -> Result<(), ObjectError>;
    fn update_phase(&self, body: &Body, slots: &mut SlotStorage);
    fn render_phase(&self, body: &Body, slots: &SlotStorage, target: &mut dyn RenderTarget);
}

//circle

#[derive(Debug, Clone, PartialEq)]
pub struct CircleShape {
    pub radius: f64,
    pub color: Color,
}

pub struct CircleRenderer {
    shape: Slot<CircleShape>,
}

impl CircleRenderer {
    pub fn new(slots: &mut SlotRegistry) -> Self {
        Self { shape: slots.alloc(None) }
    }
}

impl Renderer for CircleRenderer {
    fn init(&self, slots: &mut SlotStorage, init: &InitValues) -> Result<(), ObjectError> {
        let color = COLOR.at(init)?;
        let radius = RADIUS.at(init)?;
        self.shape.write(slots, CircleShape { radius, color })
    }

    fn update_phase(&self, _body: &Body, _slots: &mut SlotStorage) {}

    fn render_phase(&self, body: &Body, slots: &SlotStorage, target: &mut dyn RenderTarget) {
        if let Some(shape) = self.shape.get(slots) {
            target.draw(DrawCmd::Circle { center: body.pos(), radius: shape.radius, color: shape.color });
        }
    }
}

//trail

#[derive(Debug, Clone, PartialEq)]
pub struct TrailPath {
    pub points: VecDeque<Vec2>,
    pub color: Color,
}

impl TrailPath {
    //the last point always follows the object, a new one is pinned
    //once the head has moved min_dist away from the previous pinned point
    fn follow(&mut self, pos: Vec2, min_dist: f64) {
        if self.points.is_empty() {
            self.points.push_back(pos);
            self.points.push_back(pos);
            return;
        }

        if let Some(head) = self.points.back_mut() {
            *head = pos;
        }
        let len = self.points.len();
        let pinned = self.points[len.saturating_sub(2)];
        if (pos - pinned).magnitude() >= min_dist {
            self.points.push_back(pos);
        }

        while self.points.len() > TRAIL_CAP {
            self.points.pop_front();
        }
    }
}

pub struct TrailRenderer {
    path: Slot<TrailPath>,
    min_dist: f64,
}

impl TrailRenderer {
    pub fn new(slots: &mut SlotRegistry, min_dist: f64) -> Self {
        Self { path: slots.alloc(None), min_dist }
    }
}

impl Renderer for TrailRenderer {
    fn init(&self, slots: &mut SlotStorage, init: &InitValues) -> Result<(), ObjectError> {
        let color = TRAIL_COLOR.at(init)?;
        self.path.write(slots, TrailPath { points: VecDeque::new(), color })
    }

    fn update_phase(&self, body: &Body, slots: &mut SlotStorage) {
        if let Some(path) = self.path.get_mut(slots) {
            path.follow(body.pos(), self.min_dist);
        }
    }

    fn render_phase(&self, _body: &Body, slots: &SlotStorage, target: &mut dyn RenderTarget) {
        let Some(path) = self.path.get(slots) else { return };
        if path.points.len() < 2 {
            return;
        }
        target.draw(DrawCmd::Polyline { points: path.points.iter().copied().collect(), color: path.color });
    }
}

//arrows

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKind {
    Velocity,
    Acceleration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowShape {
    pub tail: Vec2,
    pub tip: Vec2,
}

pub struct ArrowRenderer {
    kind: ArrowKind,
    scale: f64,
    shape: Slot<ArrowShape>,
    color: Slot<Color>,
}

impl ArrowRenderer {
    pub fn new(slots: &mut SlotRegistry, kind: ArrowKind, scale: f64) -> Self {
        Self {
            kind,
            scale,
            shape: slots.alloc(None),
            color: slots.alloc(Some(ARROW_COLOR_SLOT)),
        }
    }

    fn vector(&self, body: &Body) -> Vec2 {
        match self.kind {
            ArrowKind::Velocity => body.vel(),
            ArrowKind::Acceleration => body.acc(),
        }
    }
}

impl Renderer for ArrowRenderer {
    fn init(&self, slots: &mut SlotStorage, init: &InitValues) -> Result<(), ObjectError> {
        let color = ARROW_COLOR.at(init)?;
        self.color.write(slots, color)?;
        self.shape.write(slots, ArrowShape { tail: Vec2::ZERO, tip: Vec2::ZERO })
    }

    fn update_phase(&self, body: &Body, slots: &mut SlotStorage) {
        let tail = body.pos();
        let tip = tail + self.vector(body) * self.scale;
        if let Some(shape) = self.shape.get_mut(slots) {
            *shape = ArrowShape { tail, tip };
        }
    }

    fn render_phase(&self, _body: &Body, slots: &SlotStorage, target: &mut dyn RenderTarget) {
        let (Some(shape), Some(&color)) = (self.shape.get(slots), self.color.get(slots)) else {
            return;
        };
        let shaft = shape.tip - shape.tail;
        let len = shaft.magnitude();
        if len < 1e-9 {
            return;
        }

        target.draw(DrawCmd::Line { from: shape.tail, to: shape.tip, color, thickness: 2.0 });

        let head = (len * 0.25).min(8.0);
        let dir = shaft.normalize();
        let base = shape.tip - dir * head;
        let side = dir.perp() * (head * 0.5);
        target.draw(DrawCmd::Triangle { points: [shape.tip, base + side, base - side], color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_for(registry: &SlotRegistry, kinds: Vec<crate::object::SlotKind>) -> SlotStorage {
        assert_eq!(registry.len(), kinds.len());
        SlotStorage::new(kinds.into())
    }

    #[test]
    fn trail_pins_points_after_min_distance() {
        let mut path = TrailPath { points: VecDeque::new(), color: Color::WHITE };
        path.follow(Vec2::new(0.0, 0.0), 5.0);
        assert_eq!(path.points.len(), 2);

        //head moves, nothing pinned yet
        path.follow(Vec2::new(3.0, 0.0), 5.0);
        assert_eq!(path.points.len(), 2);
        assert_eq!(path.points[1], Vec2::new(3.0, 0.0));

        path.follow(Vec2::new(6.0, 0.0), 5.0);
        assert_eq!(path.points.len(), 3);
    }

    #[test]
    fn trail_is_capped() {
        let mut path = TrailPath { points: VecDeque::new(), color: Color::WHITE };
        for i in 0..(TRAIL_CAP + 50) {
            path.follow(Vec2::new(i as f64 * 10.0, 0.0), 1.0);
        }
        assert_eq!(path.points.len(), TRAIL_CAP);
        assert_eq!(path.points.back(), Some(&Vec2::new((TRAIL_CAP + 49) as f64 * 10.0, 0.0)));
    }

    #[test]
    fn velocity_arrow_tip_is_scaled() {
        use crate::object::SlotKind;

        let mut registry = SlotRegistry::default();
        let arrow = ArrowRenderer::new(&mut registry, ArrowKind::Velocity, 2.0);
        let mut slots = storage_for(&registry, vec![SlotKind::Arrow, SlotKind::Color]);

        let init: InitValues = [("arrow_color".to_string(), Value::Color(Color::rgb(255, 0, 0)))].into_iter().collect();
        arrow.init(&mut slots, &init).unwrap();

        let mut body = Body::new(1.0);
        body.set_pos(Vec2::new(1.0, 1.0));
        body.set_vel(Vec2::new(3.0, 0.0));
        arrow.update_phase(&body, &mut slots);

        let mut frame = Frame::default();
        arrow.render_phase(&body, &slots, &mut frame);
        assert_eq!(frame.world.len(), 2);
        assert_eq!(
            frame.world[0],
            DrawCmd::Line {
                from: Vec2::new(1.0, 1.0),
                to: Vec2::new(7.0, 1.0),
                color: Color::rgb(255, 0, 0),
                thickness: 2.0
            }
        );
    }

    #[test]
    fn zero_arrow_draws_nothing() {
        use crate::object::SlotKind;

        let mut registry = SlotRegistry::default();
        let arrow = ArrowRenderer::new(&mut registry, ArrowKind::Acceleration, 1.0);
        let mut slots = storage_for(&registry, vec![SlotKind::Arrow, SlotKind::Color]);
        let init: InitValues = [("arrow_color".to_string(), Value::Color(Color::WHITE))].into_iter().collect();
        arrow.init(&mut slots, &init).unwrap();

        let body = Body::new(1.0);
        arrow.update_phase(&body, &mut slots);
        let mut frame = Frame::default();
        arrow.render_phase(&body, &slots, &mut frame);
        assert!(frame.world.is_empty());
    }

    #[test]
    fn circle_draws_at_body_position() {
        use crate::object::SlotKind;

        let mut registry = SlotRegistry::default();
        let circle = CircleRenderer::new(&mut registry);
        let mut slots = storage_for(&registry, vec![SlotKind::Circle]);
        let init: InitValues = [
            ("color".to_string(), Value::Color(Color::WHITE)),
            ("radius".to_string(), Value::Number(4.0)),
        ]
        .into_iter()
        .collect();
        circle.init(&mut slots, &init).unwrap();

        let mut body = Body::new(1.0);
        body.set_pos(Vec2::new(-2.0, 5.0));
        let mut frame = Frame::default();
        circle.render_phase(&body, &slots, &mut frame);
        assert_eq!(
            frame.world,
            vec![DrawCmd::Circle { center: Vec2::new(-2.0, 5.0), radius: 4.0, color: Color::WHITE }]
        );
    }
}
