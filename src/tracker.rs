//tracker.rs - samples a derived quantity of some objects at a fixed interval
//every tracked series keeps the last sample_n values, oldest dropped first

use std::collections::VecDeque;
use std::fmt;

use crate::object::{Body, Object};
use crate::types::*;
use crate::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorQuantity {
    Pos,
    Vel,
    Momentum,
    Acc,
    Force,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Magnitude,
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedQuantity {
    Vector(VectorQuantity, Axis),
    KineticEnergy,
}

impl TrackedQuantity {
    //pos, vel, momentum, acc, force, ke, and the vector ones with _x/_y
    pub fn parse(name: &str) -> Option<TrackedQuantity> {
        if name == "ke" {
            return Some(TrackedQuantity::KineticEnergy);
        }

        let (base, axis) = if let Some(base) = name.strip_suffix("_x") {
            (base, Axis::X)
        } else if let Some(base) = name.strip_suffix("_y") {
            (base, Axis::Y)
        } else {
            (name, Axis::Magnitude)
        };

        let quantity = match base {
            "pos" => VectorQuantity::Pos,
            "vel" => VectorQuantity::Vel,
            "momentum" => VectorQuantity::Momentum,
            "acc" => VectorQuantity::Acc,
            "force" => VectorQuantity::Force,
            _ => return None,
        };
        Some(TrackedQuantity::Vector(quantity, axis))
    }

    pub fn value(self, body: &Body) -> f64 {
        match self {
            TrackedQuantity::KineticEnergy => 0.5 * body.mass() * body.vel().dot(body.vel()),
            TrackedQuantity::Vector(quantity, axis) => {
                let v: Vec2 = match quantity {
                    VectorQuantity::Pos => body.pos(),
                    VectorQuantity::Vel => body.vel(),
                    VectorQuantity::Momentum => body.vel() * body.mass(),
                    VectorQuantity::Acc => body.acc(),
                    VectorQuantity::Force => body.acc() * body.mass(),
                };
                match axis {
                    Axis::Magnitude => v.magnitude(),
                    Axis::X => v.x,
                    Axis::Y => v.y,
                }
            }
        }
    }
}

impl fmt::Display for TrackedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (quantity, axis) = match self {
            TrackedQuantity::KineticEnergy => return f.write_str("ke"),
            TrackedQuantity::Vector(q, a) => (q, a),
        };
        let base = match quantity {
            VectorQuantity::Pos => "pos",
            VectorQuantity::Vel => "vel",
            VectorQuantity::Momentum => "momentum",
            VectorQuantity::Acc => "acc",
            VectorQuantity::Force => "force",
        };
        match axis {
            Axis::Magnitude => f.write_str(base),
            Axis::X => write!(f, "{}_x", base),
            Axis::Y => write!(f, "{}_y", base),
        }
    }
}

pub struct Series {
    object: ObjectHandle,
    quantity: TrackedQuantity,
    color: Color,
    samples: VecDeque<f64>,
}

impl Series {
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn label(&self) -> String {
        format!("{} #{}", self.quantity, self.object.0)
    }
}

pub struct Tracker {
    sample_ticks: f64,
    sample_n: usize,
    width: f64,
    ticks: f64,
    series: Vec<Series>,
}

impl Tracker {
    pub fn new(sample_ticks: f64, sample_n: usize, width: f64) -> Self {
        Self { sample_ticks, sample_n, width, ticks: 0.0, series: Vec::new() }
    }

    pub fn track(&mut self, object: ObjectHandle, quantity: TrackedQuantity, color: Color) {
        self.series.push(Series {
            object,
            quantity,
            color,
            samples: VecDeque::new(),
        });
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    //runs once per committed tick
    pub fn sample(&mut self, objects: &[Object], dt: f64) {
        self.ticks += dt;
        if self.ticks <= self.sample_ticks {
            return;
        }

        for series in &mut self.series {
            let Some(obj) = objects.get(series.object.0) else { continue };
            if self.sample_n == 0 {
                continue;
            }
            if series.samples.len() == self.sample_n {
                series.samples.pop_front();
            }
            series.samples.push_back(series.quantity.value(obj.body()));
        }
        self.ticks -= self.sample_ticks;
    }

    //screen space strip chart, one line per series
    pub fn render_overlay(&self, target: &mut dyn RenderTarget) {
        for series in &self.series {
            if series.samples.len() < 2 {
                continue;
            }
            let points = series
                .samples()
                .enumerate()
                .map(|(j, v)| Vec2::new(j as f64 * self.width, 100.0 - v + 20.0))
                .collect();
            target.draw_overlay(DrawCmd::Polyline { points, color: series.color });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::movement::DefaultController;
    use crate::object::{InitValues, ObjectClassBuilder};

    fn moving_object(vel: Vec2) -> Vec<Object> {
        let class = Arc::new(ObjectClassBuilder::new("dot", Box::new(DefaultController::default())).finish());
        let mut obj = Object::new(0, class, 2.0, &InitValues::new()).unwrap();
        obj.body_mut().set_vel(vel);
        vec![obj]
    }

    #[test]
    fn parses_quantity_names() {
        assert_eq!(
            TrackedQuantity::parse("vel"),
            Some(TrackedQuantity::Vector(VectorQuantity::Vel, Axis::Magnitude))
        );
        assert_eq!(
            TrackedQuantity::parse("force_y"),
            Some(TrackedQuantity::Vector(VectorQuantity::Force, Axis::Y))
        );
        assert_eq!(TrackedQuantity::parse("ke"), Some(TrackedQuantity::KineticEnergy));
        assert_eq!(TrackedQuantity::parse("ke_x"), None);
        assert_eq!(TrackedQuantity::parse("spin"), None);
        assert_eq!(TrackedQuantity::parse("momentum_x").map(|q| q.to_string()), Some("momentum_x".into()));
    }

    #[test]
    fn kinetic_energy_uses_mass() {
        let objects = moving_object(Vec2::new(3.0, 4.0));
        assert_eq!(TrackedQuantity::KineticEnergy.value(objects[0].body()), 25.0);
    }

    #[test]
    fn samples_once_interval_passes() {
        let objects = moving_object(Vec2::new(0.0, 2.0));
        let mut tracker = Tracker::new(1.0, 3, 3.0);
        tracker.track(ObjectHandle(0), TrackedQuantity::parse("vel_y").unwrap(), Color::WHITE);

        tracker.sample(&objects, 0.6);
        assert_eq!(tracker.series()[0].samples().count(), 0);
        tracker.sample(&objects, 0.6);
        assert_eq!(tracker.series()[0].samples().collect::<Vec<_>>(), vec![2.0]);
    }

    #[test]
    fn ring_buffer_keeps_newest() {
        let mut objects = moving_object(Vec2::ZERO);
        let mut tracker = Tracker::new(0.5, 2, 3.0);
        tracker.track(ObjectHandle(0), TrackedQuantity::parse("vel_x").unwrap(), Color::WHITE);
        for x in [1.0, 2.0, 3.0] {
            objects[0].body_mut().set_vel(Vec2::new(x, 0.0));
            tracker.sample(&objects, 1.0);
        }
        assert_eq!(tracker.series()[0].samples().collect::<Vec<_>>(), vec![2.0, 3.0]);
    }

    #[test]
    fn huge_sample_count_does_not_preallocate() {
        let objects = moving_object(Vec2::new(1.0, 0.0));
        let mut tracker = Tracker::new(0.0, usize::MAX, 3.0);
        tracker.track(ObjectHandle(0), TrackedQuantity::parse("vel_x").unwrap(), Color::WHITE);
        tracker.sample(&objects, 1.0);
        assert_eq!(tracker.series()[0].samples().collect::<Vec<_>>(), vec![1.0]);
    }

    #[test]
    fn overlay_maps_samples_to_screen() {
        let objects = moving_object(Vec2::new(10.0, 0.0));
        let mut tracker = Tracker::new(0.0, 4, 3.0);
        tracker.track(ObjectHandle(0), TrackedQuantity::parse("vel").unwrap(), Color::WHITE);
        tracker.sample(&objects, 1.0);
        tracker.sample(&objects, 1.0);

        let mut frame = Frame::default();
        tracker.render_overlay(&mut frame);
        assert!(frame.world.is_empty());
        assert_eq!(
            frame.overlay,
            vec![DrawCmd::Polyline {
                points: vec![Vec2::new(0.0, 110.0), Vec2::new(3.0, 110.0)],
                color: Color::WHITE
            }]
        );
    }
}
