//! Interactive growth viewer built with eframe/egui.
//!
//! [`Viewer`] owns a leaf set, the current [`GrowthGraph`] and the
//! [`Attractor`] steering its gravity, and implements [`eframe::App`] to
//! animate and draw them.

use std::f32::consts::PI;

use eframe::App;
use glam::Vec2;
use growth_core::{
    attractor::Attractor,
    config::{ChildLimit, FieldRange, GrowthMode, Settings},
    field::ScalarField,
    geometry::{Area, random_element, random_unit_vector},
    graph::{GrowthGraph, GrowthParams},
    poisson::PoissonDiskSampler,
    skeleton::SkeletonThreshold,
    tree::{SegmentTree, SideTable},
    types::SegmentId,
};
use log::{debug, info, warn};
use noise::Perlin;
use rand::{Rng, rngs::ThreadRng};

use crate::height_map::{DriftingHeightMap, unit_noise};

/// Half size of the square world the leaves are sampled in.
pub const WORLD_HALF_EXTENT: f32 = 500.0;

/// Frame deltas above this are clamped, so a stalled window does not fling
/// the attractor away.
const MAX_DELTA: f32 = 1.0 / 20.0;

/// Stroke width of skeleton segments, in world units.
const SKELETON_WIDTH: f32 = 1.5;

/// Main application state.
///
/// Per frame:
/// 1. Advance the clock of the height map.
/// 2. If `running` and `step_interval` has passed, [`Viewer::step_once`].
/// 3. Move the attractor ([`Viewer::update_attractor`]) and hand its
///    position to the graph as gravity point.
/// 4. Draw segments, leaves and the attractor.
///
/// ### Fields
/// - `settings` - Preset used for every new leaf set and graph.
/// - `height_map` - Noise field shared by the sampler and the growth fields.
/// - `leaves` - Leaves every graph of the current set starts from.
/// - `graph` - Graph being grown.
/// - `thickness` - Stroke width per segment of `graph`.
/// - `steps` - Growth steps of the current graph.
/// - `generations` - Graphs started on the current leaf set.
///
/// - `running` - Whether the simulation is auto-advancing.
/// - `zoom` / `pan` - Camera.
/// - `show_skeleton` / `skeleton_threshold` - Draw the simplified tree
///   instead of every segment.
pub struct Viewer {
    settings: Settings,
    height_map: DriftingHeightMap,
    wander_noise: Perlin,

    leaves: Vec<Vec2>,
    graph: GrowthGraph,
    attractor: Attractor,
    thickness: SideTable<f32>,
    steps: u32,
    generations: u32,

    rng: ThreadRng,

    running: bool,
    zoom: f32,
    pan: egui::Vec2,
    show_skeleton: bool,
    skeleton_threshold: f32,

    step_interval: f64,
    last_step_time: f64,
    last_step_dt: f64,
}

impl Viewer {
    /// Creates a viewer, samples the first leaf set and starts a graph on it.
    pub fn new(settings: Settings) -> Self {
        let mut rng = rand::rng();
        let height_map = DriftingHeightMap::new(rng.random(), settings.height_map);
        let wander_noise = Perlin::new(rng.random());

        let mut viewer = Self {
            settings,
            height_map,
            wander_noise,
            leaves: Vec::new(),
            graph: GrowthGraph::new(GrowthParams::default()),
            attractor: Attractor::new(Vec2::ZERO, settings.attractor),
            thickness: SideTable::new(),
            steps: 0,
            generations: 0,
            rng,
            running: true,
            zoom: 0.8,
            pan: egui::vec2(0.0, 0.0),
            show_skeleton: false,
            skeleton_threshold: 0.2,
            step_interval: 0.0,
            last_step_time: 0.0,
            last_step_dt: 0.0,
        };
        viewer.reset();
        viewer
    }

    /// Radius of the circular leaf region, 0 for the whole world.
    fn leaf_radius(&self) -> f32 {
        2.0 * WORLD_HALF_EXTENT * self.settings.leaves.circle_radius
    }

    fn leaf_area(&self) -> Area {
        let radius = self.leaf_radius();
        if radius > 0.0 {
            Area::centered(Vec2::ZERO, radius)
        } else {
            Area::centered(Vec2::ZERO, WORLD_HALF_EXTENT)
        }
    }

    /// Samples a new leaf set and starts a graph on it.
    fn reset(&mut self) {
        let area = self.leaf_area();
        let config = self.settings.leaves.sampler(area, Some(area.center()));
        let mut sampler = PoissonDiskSampler::new(
            &config,
            ScalarField::Varying(self.height_map.field()),
            &mut self.rng,
        );
        let generation = sampler.generate(self.settings.leaves.count, false, &mut self.rng);

        let radius = self.leaf_radius();
        let center = area.center();
        self.leaves = if radius > 0.0 {
            generation
                .samples
                .into_iter()
                .filter(|p| p.distance_squared(center) < radius * radius)
                .collect()
        } else {
            generation.samples
        };
        info!("sampled {} leaves", self.leaves.len());

        let start = random_element(&self.leaves, &mut self.rng)
            .copied()
            .unwrap_or(center);
        self.attractor = Attractor::new(start, self.settings.attractor);

        self.generations = 0;
        self.new_graph();
        self.running = true;
    }

    /// Starts a new graph on the current leaves.
    fn new_graph(&mut self) {
        let field = self.height_map.field();
        let mut graph = GrowthGraph::new(GrowthParams::from_config(&self.settings.growth, &field));
        graph.set_gravity(self.settings.gravity);
        graph.set_gravity_position(self.attractor.position);

        let origin = match random_element(&self.leaves, &mut self.rng) {
            Ok(&leaf) => leaf,
            Err(err) => {
                warn!("{err}; growing from the center");
                self.leaf_area().center()
            }
        };
        let direction = random_unit_vector(&mut self.rng);
        graph.generate(
            self.leaves.clone(),
            self.leaf_area(),
            origin,
            direction,
            1,
            &mut self.rng,
        );

        self.graph = graph;
        self.steps = 0;
        self.generations += 1;

        self.thickness.clear();
        let initial = self.settings.renderer.max_thickness / 10.0;
        let thickness = &mut self.thickness;
        self.graph.traverse(|id, _, _, _| {
            thickness.insert(id, initial);
        });
    }

    /// Advances the simulation by one growth step, or starts a new graph
    /// once the current one is exhausted or ran `max_steps` steps.
    fn step_once(&mut self) {
        if self.graph.is_exhausted() || self.steps >= self.settings.growth.max_steps {
            debug!(
                "restarting after {} steps with {} segments",
                self.steps,
                self.graph.tree().len()
            );
            self.new_graph();
            return;
        }

        self.graph.grow(&mut self.rng);
        self.steps += 1;
        self.stamp_new_segments();
    }

    /// New segments inherit their parent's thickness, thinned by
    /// `thickness_delta`.
    fn stamp_new_segments(&mut self) {
        let renderer = self.settings.renderer;
        let tree = self.graph.tree();
        for &id in self.graph.last_new_segments() {
            let parent = tree[id]
                .parent
                .and_then(|p| self.thickness.get(p).copied())
                .unwrap_or(renderer.max_thickness / 10.0);
            let thickness = (parent * (1.0 - renderer.thickness_delta)).max(renderer.min_thickness);
            self.thickness.insert(id, thickness);
        }
    }

    /// Moves the attractor by `delta` seconds and hands its position to the
    /// graph.
    ///
    /// ### Parameters
    /// - `delta` - Frame time; clamped to [`MAX_DELTA`].
    /// - `pointer` - World position of the pointer while it hovers the
    ///   canvas. Without one the attractor wanders along a noise field and
    ///   is pulled back towards the center.
    /// - `time` - Clock of the wandering noise, in seconds.
    fn update_attractor(&mut self, delta: f32, pointer: Option<Vec2>, time: f64) {
        self.attractor.update(delta.min(MAX_DELTA));

        match pointer {
            Some(target) => self.attractor.move_towards(target),
            None => {
                let cfg = self.attractor.config;
                let position = self.attractor.position;
                let n = unit_noise(
                    &self.wander_noise,
                    (position.x * cfg.noise_frequency) as f64 + cfg.noise_speed as f64 * time * 1000.0,
                    (position.y * cfg.noise_frequency) as f64,
                );
                let angle = 8.0 * n * PI;
                self.attractor
                    .add_force(Vec2::new(angle.cos(), angle.sin()) * cfg.noise_amount);

                let to_center = self.leaf_area().center() - position;
                let pull = to_center.length().powf(cfg.gravity_falloff) * cfg.gravity_amount;
                self.attractor.add_force(to_center * pull);
            }
        }

        self.graph.set_gravity_position(self.attractor.position);
    }

    /// Converts a world-space position to screen-space.
    ///
    /// World coordinates are scaled by `zoom`, offset by `pan`, and then
    /// centered inside `rect`. The y-axis is flipped so that positive y
    /// goes up in world space.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        egui::pos2(
            center.x + p.x * self.zoom + self.pan.x,
            center.y - p.y * self.zoom + self.pan.y,
        )
    }

    /// Inverse of [`Viewer::world_to_screen`].
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let center = rect.center();
        let x = (p.x - center.x - self.pan.x) / self.zoom;
        let y = (center.y - p.y + self.pan.y) / self.zoom;
        Vec2::new(x, y)
    }

    fn labeled_drag_u32(ui: &mut egui::Ui, label: &str, value: &mut u32, range: std::ops::RangeInclusive<u32>) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(1.0));
        });
    }

    fn labeled_range(ui: &mut egui::Ui, label: &str, value: &mut FieldRange, max: f32, speed: f64) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(&mut value.min).range(0.0..=max).speed(speed));
            ui.add(egui::DragValue::new(&mut value.max).range(0.0..=max).speed(speed));
        });
    }

    /// Builds the top panel UI (run controls, stepping, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button(if self.running { "⏸ Pause" } else { "▶ Run" })
                    .clicked()
                {
                    self.running = !self.running;
                }

                ui.add(
                    egui::DragValue::new(&mut self.step_interval)
                        .prefix("dt target = ")
                        .range(0.0..=1.0)
                        .speed(0.01),
                );

                if ui.button("Step").clicked() {
                    let now = ctx.input(|i| i.time);
                    if self.last_step_time > 0.0 {
                        self.last_step_dt = now - self.last_step_time;
                    }
                    self.step_once();
                    self.last_step_time = now;
                }

                if ui.button("Regrow").clicked() {
                    self.new_graph();
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.1..=10.0).text("Zoom"));
                ui.checkbox(&mut self.show_skeleton, "Skeleton");
            });
        });
    }

    /// Builds the bottom status bar.
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("dt last = {:.3} s", self.last_step_dt));
                ui.separator();
                if self.graph.is_exhausted() {
                    ui.label("exhausted");
                }
                ui.label(format!("graph #{}", self.generations));
                ui.label(format!("steps = {}/{}", self.steps, self.settings.growth.max_steps));
                ui.label(format!("segments = {}", self.graph.tree().len()));
                ui.label(format!(
                    "leaves = {}/{}",
                    self.graph.leaves().len(),
                    self.leaves.len()
                ));
            });
        });
    }

    /// Builds the right-hand panel. Growth changes apply to the next graph,
    /// leaf changes to the next reset.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Settings");

                ui.separator();
                ui.label("Growth");
                let growth = &mut self.settings.growth;
                egui::ComboBox::from_label("mode")
                    .selected_text(format!("{:?}", growth.mode))
                    .show_ui(ui, |ui| {
                        for mode in [GrowthMode::Open, GrowthMode::Closed, GrowthMode::BrokenClosed] {
                            ui.selectable_value(&mut growth.mode, mode, format!("{mode:?}"));
                        }
                    });
                Self::labeled_drag_u32(ui, "max_steps:", &mut growth.max_steps, 1..=5000);
                Self::labeled_drag_u32(ui, "min_depth:", &mut growth.min_depth, 0..=100);

                let mut limited = growth.max_children.max().is_some();
                ui.checkbox(&mut limited, "limit children");
                growth.max_children = if limited {
                    let mut max = growth.max_children.max().unwrap_or(2);
                    ui.add(egui::DragValue::new(&mut max).range(1..=16).prefix("max_children = "));
                    ChildLimit::Limited(max)
                } else {
                    ChildLimit::Unlimited
                };

                Self::labeled_range(ui, "min_distance:", &mut growth.min_distance, 500.0, 0.5);
                Self::labeled_range(ui, "max_distance:", &mut growth.max_distance, 1000.0, 1.0);
                Self::labeled_range(ui, "dynamics:", &mut growth.dynamics, 1.0, 0.01);
                Self::labeled_range(ui, "step_size:", &mut growth.step_size, 100.0, 0.1);
                Self::labeled_range(ui, "deviation:", &mut growth.random_deviation, 50.0, 0.05);

                ui.separator();
                ui.label("Leaves");
                let leaves = &mut self.settings.leaves;
                ui.add(egui::DragValue::new(&mut leaves.count).range(0..=50_000).prefix("count = "));
                Self::labeled_drag_u32(ui, "tries:", &mut leaves.tries, 1..=64);
                ui.add(egui::Slider::new(&mut leaves.min_radius, 0.0..=100.0).text("min radius"));
                ui.add(egui::Slider::new(&mut leaves.max_radius, 1.0..=400.0).text("max radius"));
                ui.add(egui::Slider::new(&mut leaves.circle_radius, 0.0..=0.5).text("circle"));

                ui.separator();
                ui.add(
                    egui::Slider::new(&mut self.skeleton_threshold, 0.0..=PI).text("skeleton angle"),
                );

                ui.separator();
                if ui.button("Reset settings to default").clicked() {
                    self.settings = Settings::default();
                }
            });
    }

    /// World-space width of segment `id`. Trees without a thickness table
    /// (the skeleton, whose ids are its own) are drawn at a fixed width.
    fn stroke_width(widths: Option<&SideTable<f32>>, id: SegmentId) -> f32 {
        match widths {
            Some(widths) => widths.get(id).copied().unwrap_or(1.0),
            None => SKELETON_WIDTH,
        }
    }

    fn draw_tree(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        tree: &SegmentTree,
        widths: Option<&SideTable<f32>>,
        highlight: &[SegmentId],
    ) {
        for (id, segment) in tree.segments().iter().enumerate() {
            let Some(parent) = segment.parent else {
                continue;
            };
            let a = self.world_to_screen(tree[parent].origin, rect);
            let b = self.world_to_screen(segment.origin, rect);

            let width = Self::stroke_width(widths, id) * self.zoom;
            let color = if highlight.contains(&id) {
                egui::Color32::RED
            } else {
                egui::Color32::WHITE
            };
            painter.line_segment([a, b], egui::Stroke::new(width.max(1.0), color));
        }
    }

    /// Builds the central panel where the graph is drawn and interacted with.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);
            painter.rect_filled(rect, 0.0, egui::Color32::from_gray(12));

            // Pan with drag.
            if response.dragged() {
                self.pan += response.drag_delta();
            }

            let hover_world = response.hover_pos().map(|p| self.screen_to_world(p, rect));

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(0.1, 10.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            let (now, dt) = ctx.input(|i| (i.time, i.stable_dt));
            self.height_map.set_time(now);

            if self.running {
                let elapsed = now - self.last_step_time;
                if elapsed >= self.step_interval {
                    if self.last_step_time > 0.0 {
                        self.last_step_dt = elapsed;
                    }
                    self.step_once();
                    self.last_step_time = now;
                }
                self.update_attractor(dt, hover_world, now);
                ctx.request_repaint();
            }

            for &leaf in self.graph.leaves() {
                let p = self.world_to_screen(leaf, rect);
                painter.circle_filled(p, 1.5, egui::Color32::from_gray(90));
            }

            if self.show_skeleton {
                let threshold = SkeletonThreshold::Constant(self.skeleton_threshold);
                let skeleton = self.graph.to_skeleton(&threshold);
                self.draw_tree(&painter, rect, &skeleton, None, &[]);
            } else {
                self.draw_tree(
                    &painter,
                    rect,
                    self.graph.tree(),
                    Some(&self.thickness),
                    self.graph.last_new_segments(),
                );
            }

            let a = self.world_to_screen(self.attractor.position, rect);
            painter.circle_stroke(a, 6.0, egui::Stroke::new(1.5, egui::Color32::YELLOW));
        });
    }
}

impl App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}
