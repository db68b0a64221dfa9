//world.rs -> the simulation space ->
// owns classes, objects, springs and the tracker, and steps them
// accumulate forces -> integrate -> commit, `cycles` times per frame

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::{Clock, FramerateCounter, TickCounter};
use crate::error::{EvalError, ObjectError};
use crate::movement::DEFAULT_MAX_VELOCITY;
use crate::object::{InitValues, Object, ObjectClass};
use crate::special::SpecialObject;
use crate::tracker::Tracker;
use crate::types::*;
use crate::vec2::Vec2;

pub const MAX_CYCLES: usize = 200_000;
pub const MIN_TICK_MULT: f64 = 0.0001;

//numeric settings coming from the command line
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub cycles: usize,
    pub tick_mult: f64,
    pub max_velocity: f64,
    pub drag_enabled: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { cycles: 1, tick_mult: 1.0, max_velocity: DEFAULT_MAX_VELOCITY, drag_enabled: true }
    }
}

pub struct World {
    classes: HashMap<String, Arc<ObjectClass>>,
    objects: Vec<Object>,
    forces: Vec<Vec2>,
    specials: Vec<Box<dyn SpecialObject>>,
    tracker: Option<Tracker>,
    tracker_generation: usize,
    clock: Box<dyn Clock>,
    fps: FramerateCounter,
    config: SimConfig,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        Self::with_clock(config, Box::new(TickCounter::new()))
    }

    pub fn with_clock(config: SimConfig, clock: Box<dyn Clock>) -> Self {
        let mut world = Self {
            classes: HashMap::new(),
            objects: Vec::new(),
            forces: Vec::new(),
            specials: Vec::new(),
            tracker: None,
            tracker_generation: 0,
            clock,
            fps: FramerateCounter::default(),
            config: config.clone(),
        };
        //route through the setters so command line values get clamped too
        world.set_cycles(config.cycles);
        world.set_tick_mult(config.tick_mult);
        world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn cycles(&self) -> usize {
        self.config.cycles
    }

    pub fn tick_mult(&self) -> f64 {
        self.config.tick_mult
    }

    pub fn set_cycles(&mut self, n: usize) {
        self.config.cycles = n.clamp(1, MAX_CYCLES);
    }

    pub fn set_tick_mult(&mut self, m: f64) {
        //also catches NaN
        self.config.tick_mult = if m >= MIN_TICK_MULT { m } else { MIN_TICK_MULT };
    }

    //classes

    pub fn add_class(&mut self, class: ObjectClass) {
        let name = class.name().to_string();
        if self.classes.contains_key(&name) {
            warn!(target: "phyconf", "object type {} redefined, replacing the earlier definition", name);
        }
        debug!(
            target: "phyconf",
            "registered object type {} ({} forces, {} renderers, {} slots)",
            name,
            class.force_count(),
            class.renderer_count(),
            class.slot_count()
        );
        self.classes.insert(name, Arc::new(class));
    }

    #[cfg(test)]
    pub fn class(&self, name: &str) -> Option<&ObjectClass> {
        self.classes.get(name).map(|c| c.as_ref())
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    //objects

    pub fn create_object(&mut self, class_name: &str, mass: f64, init: &InitValues) -> Result<ObjectHandle, ObjectError> {
        let class = self
            .classes
            .get(class_name)
            .cloned()
            .ok_or_else(|| ObjectError::UnknownClass(class_name.to_string()))?;
        let id = self.objects.len();
        self.objects.push(Object::new(id, class, mass, init)?);
        Ok(ObjectHandle(id))
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    #[cfg(test)]
    pub fn object(&self, handle: ObjectHandle) -> Option<&Object> {
        self.objects.get(handle.0)
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut Object> {
        self.objects.get_mut(handle.0)
    }

    pub fn add_special(&mut self, special: Box<dyn SpecialObject>) {
        self.specials.push(special);
    }

    pub fn special_count(&self) -> usize {
        self.specials.len()
    }

    //tracker

    //a new tracker replaces the old one, handles to the old one go stale
    pub fn make_tracker(&mut self, sample_ticks: f64, sample_n: usize, width: f64) -> TrackerHandle {
        self.tracker_generation += 1;
        self.tracker = Some(Tracker::new(sample_ticks, sample_n, width));
        TrackerHandle(self.tracker_generation)
    }

    pub fn tracker(&self) -> Option<&Tracker> {
        self.tracker.as_ref()
    }

    pub fn tracker_mut(&mut self, handle: TrackerHandle) -> Result<&mut Tracker, EvalError> {
        if handle.0 != self.tracker_generation {
            return Err(EvalError::StaleTracker);
        }
        self.tracker.as_mut().ok_or(EvalError::StaleTracker)
    }

    //stepping

    //one full accumulate -> integrate -> commit pass
    pub fn tick(&mut self, dt: f64) {
        let n = self.objects.len();
        self.forces.clear();
        self.forces.resize(n, Vec2::ZERO);

        //forces only ever see committed state
        for i in 0..n {
            for j in 0..n {
                self.forces[i] += self.objects[i].apply_force(&self.objects[j]);
            }
        }
        for special in &self.specials {
            special.apply_forces(&self.objects, &mut self.forces);
        }

        for (obj, force) in self.objects.iter_mut().zip(&self.forces) {
            obj.integrate(dt, *force);
        }

        for obj in &mut self.objects {
            obj.step_time();
        }
        for special in &mut self.specials {
            special.step_time(&self.objects);
        }
        if let Some(tracker) = &mut self.tracker {
            tracker.sample(&self.objects, dt);
        }
    }

    //every cycle reads its own delta from the clock
    pub fn run_cycles(&mut self) {
        for _ in 0..self.config.cycles {
            let dt = self.clock.dt() * self.config.tick_mult;
            self.tick(dt);
        }
    }

    //drop the time that passed while the script was loading
    pub fn reset_clock(&mut self) {
        self.clock.dt();
    }

    pub fn draw(&self, target: &mut dyn RenderTarget) {
        for obj in &self.objects {
            obj.render(target);
        }
        for special in &self.specials {
            special.render(&self.objects, target);
        }
        if let Some(tracker) = &self.tracker {
            tracker.render_overlay(target);
        }
    }

    //one frame: step, draw, fps and status text
    pub fn render(&mut self, status: &str, target: &mut dyn RenderTarget) {
        self.fps.update();
        self.run_cycles();
        self.draw(target);
        target.draw_overlay(DrawCmd::Text {
            pos: Vec2::ZERO,
            text: format!("FPS={}\n{}", self.fps.get(), status),
            size: 14.0,
            color: Color::WHITE,
        });
    }

    pub fn total_momentum(&self) -> Vec2 {
        self.objects.iter().fold(Vec2::ZERO, |acc, obj| acc + obj.body().momentum())
    }
}
