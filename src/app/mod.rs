use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use eframe::egui::{self, Context};

use crate::data::{
    ClusterHierarchy, DirTopicSource, TopicSource, UnavailableTopicSource, load_hierarchy,
};
use crate::layout::PackedNode;

mod camera;
mod color;
mod map;
mod nav;
mod render_utils;
mod topic_cache;
mod ui;

use camera::CameraRig;
use nav::{NavStore, NavSubscription};
use topic_cache::TopicCache;
use ui::outline::OutlineState;

pub struct ClioApp {
    hierarchy_path: PathBuf,
    topics_dir: Option<PathBuf>,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<ClusterHierarchy, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    hierarchy: ClusterHierarchy,
    nav: NavStore,
    topics: TopicCache,
    rig: CameraRig,
    packed: Vec<PackedNode>,
    layout_key: Option<LayoutKey>,
    layout_error: Option<String>,
    outline: OutlineState,
    outline_sync: NavSubscription,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    show_fps: bool,
    fps_current: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LayoutKey {
    root_id: Option<String>,
    width: i32,
    height: i32,
}

struct SearchMatchCache {
    query: String,
    matches: Arc<HashSet<String>>,
}

impl ClioApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        hierarchy_path: PathBuf,
        topics_dir: Option<PathBuf>,
    ) -> Self {
        let state = Self::start_load(hierarchy_path.clone());
        Self {
            hierarchy_path,
            topics_dir,
            state,
        }
    }

    fn start_load(hierarchy_path: PathBuf) -> AppState {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_hierarchy(&hierarchy_path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        AppState::Loading { rx }
    }

}

fn topic_source(topics_dir: Option<&PathBuf>) -> Arc<dyn TopicSource> {
    match topics_dir {
        Some(dir) => Arc::new(DirTopicSource::new(dir.clone())),
        None => Arc::new(UnavailableTopicSource),
    }
}

impl eframe::App for ClioApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(hierarchy) => {
                            let source = topic_source(self.topics_dir.as_ref());
                            AppState::Ready(Box::new(ViewModel::new(hierarchy, source)))
                        }
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading cluster hierarchy...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load cluster hierarchy");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.hierarchy_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                model.show(ctx);
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(hierarchy: ClusterHierarchy, topic_source: Arc<dyn TopicSource>) -> Self {
        let nav = NavStore::new();
        let outline_sync = nav.subscribe();

        Self {
            hierarchy,
            nav,
            topics: TopicCache::new(topic_source),
            rig: CameraRig::new(),
            packed: Vec::new(),
            layout_key: None,
            layout_error: None,
            outline: OutlineState::new(),
            outline_sync,
            search: String::new(),
            search_match_cache: None,
            show_fps: true,
            fps_current: 0.0,
        }
    }

    fn show(&mut self, ctx: &Context) {
        self.update_fps_counter(ctx);
        if self.topics.poll_completions() {
            ctx.request_repaint();
        }

        self.draw_panels(ctx);

        // Fetch completions arrive over a channel; keep polling while any
        // fetch is outstanding so results show without user input.
        if self.topics.has_loading() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    /// Ids whose names fuzzy-match the search box, for highlight only.
    /// Active selections suppress search highlighting, as selection styling
    /// takes over the same visual channel.
    fn search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        if self.nav.state().selected_node_id.is_some() {
            return None;
        }

        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let stale = self
            .search_match_cache
            .as_ref()
            .is_none_or(|cache| cache.query != query);
        if stale {
            use fuzzy_matcher::FuzzyMatcher;
            use fuzzy_matcher::skim::SkimMatcherV2;

            let matcher = SkimMatcherV2::default();
            let mut matches = HashSet::new();
            let mut stack = self.hierarchy.top_level().iter().collect::<Vec<_>>();
            while let Some(node) = stack.pop() {
                if matcher.fuzzy_match(&node.name, query).is_some()
                    || matcher
                        .fuzzy_match(&node.name.to_ascii_lowercase(), &query.to_ascii_lowercase())
                        .is_some()
                {
                    matches.insert(node.id.clone());
                }
                stack.extend(node.children.iter());
            }

            self.search_match_cache = Some(SearchMatchCache {
                query: query.to_string(),
                matches: Arc::new(matches),
            });
        }

        self.search_match_cache
            .as_ref()
            .map(|cache| Arc::clone(&cache.matches))
    }
}
