//gui.rs - graphical user interface using egui
//the world draws into a Frame, this file only turns those commands into
//egui shapes through a pan/zoom camera

use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use tracing::info;

use crate::error::ConfigError;
use crate::types::*;
use crate::vec2::Vec2;
use crate::world::World;

//application state

pub struct SimApp {
    world: World,
    frame: Frame,
    running: bool,
    show_plot: bool,
    camera: Camera,
}

//world units -> screen pixels
struct Camera {
    offset: Vec2,
    zoom: f32,
}

impl Camera {
    fn to_screen(&self, rect: egui::Rect, p: Vec2) -> egui::Pos2 {
        let rel = (p - self.offset) * self.zoom as f64;
        rect.center() + egui::vec2(rel.x as f32, rel.y as f32)
    }
}

impl SimApp {
    pub fn new(world: World) -> Self {
        Self {
            world,
            frame: Frame::default(),
            running: true,
            show_plot: true,
            camera: Camera { offset: Vec2::ZERO, zoom: 1.0 },
        }
    }

    fn status(&self) -> String {
        format!(
            "{} | {} object(s) | {} cycle(s)/frame",
            if self.running { "running" } else { "paused" },
            self.world.objects().len(),
            self.world.cycles()
        )
    }

    //mouse drag pans, scroll zooms around the view center
    fn handle_camera(&mut self, ui: &egui::Ui, response: &egui::Response) {
        let drag = response.drag_delta();
        if drag != egui::Vec2::ZERO {
            self.camera.offset -= Vec2::new(drag.x as f64, drag.y as f64) / self.camera.zoom as f64;
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                self.camera.zoom = (self.camera.zoom * (1.0 + scroll * 0.002)).clamp(0.01, 100.0);
            }
        }
    }
}

//egui application - ui rendering

impl eframe::App for SimApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(if self.running { "Stop" } else { "Start" }).clicked() {
                    self.running = !self.running;
                    //whatever time passed while paused is not simulated
                    if self.running {
                        self.world.reset_clock();
                    }
                }
                if ui.button("Center").clicked() {
                    self.camera = Camera { offset: Vec2::ZERO, zoom: 1.0 };
                }
                ui.checkbox(&mut self.show_plot, "Tracker plot");
                ui.label(self.status());
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let size = ui.available_size();
            let (response, painter) = ui.allocate_painter(size, egui::Sense::drag());
            self.handle_camera(ui, &response);

            self.frame.clear();
            if self.running {
                let status = self.status();
                self.world.render(&status, &mut self.frame);
            } else {
                self.world.draw(&mut self.frame);
            }

            let rect = response.rect;
            painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(20, 20, 20));
            for cmd in &self.frame.world {
                paint(&painter, cmd, |p| self.camera.to_screen(rect, p), self.camera.zoom);
            }
            for cmd in &self.frame.overlay {
                paint(&painter, cmd, |p| rect.min + egui::vec2(p.x as f32, p.y as f32), 1.0);
            }
        });

        if self.show_plot {
            if let Some(tracker) = self.world.tracker() {
                egui::Window::new("Tracker").default_size([420.0, 260.0]).show(ctx, |ui| {
                    Plot::new("tracker_plot").legend(Legend::default()).show(ui, |plot_ui| {
                        for series in tracker.series() {
                            let ys: Vec<f64> = series.samples().collect();
                            plot_ui.line(
                                Line::new(PlotPoints::from_ys_f64(&ys))
                                    .color(color32(series.color()))
                                    .name(series.label()),
                            );
                        }
                    });
                });
            }
        }

        if self.running {
            ctx.request_repaint();
        }
    }
}

fn color32(c: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

fn paint(painter: &egui::Painter, cmd: &DrawCmd, map: impl Fn(Vec2) -> egui::Pos2, scale: f32) {
    match cmd {
        DrawCmd::Circle { center, radius, color } => {
            painter.circle_filled(map(*center), *radius as f32 * scale, color32(*color));
        }
        DrawCmd::Line { from, to, color, thickness } => {
            painter.line_segment([map(*from), map(*to)], egui::Stroke::new(*thickness, color32(*color)));
        }
        DrawCmd::Polyline { points, color } => {
            let points = points.iter().map(|p| map(*p)).collect();
            painter.add(egui::Shape::line(points, egui::Stroke::new(1.0, color32(*color))));
        }
        DrawCmd::Triangle { points, color } => {
            let points = points.iter().map(|p| map(*p)).collect();
            painter.add(egui::Shape::convex_polygon(points, color32(*color), egui::Stroke::NONE));
        }
        DrawCmd::Text { pos, text, size, color } => {
            painter.text(
                map(*pos),
                egui::Align2::LEFT_TOP,
                text,
                egui::FontId::proportional(*size),
                color32(*color),
            );
        }
    }
}

//run gui
pub fn run_with_gui(world: World) -> Result<(), ConfigError> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 750.0])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };
    info!(target: "phyconf", "opening window");
    let result = eframe::run_native(
        "phyconf",
        options,
        Box::new(move |_| Ok(Box::new(SimApp::new(world)))),
    );
    info!(target: "phyconf", "window closed");
    result.map_err(|e| ConfigError::Window(e.to_string()))
}
