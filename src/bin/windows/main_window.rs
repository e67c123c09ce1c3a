use std::sync::Arc;

use egui::{CentralPanel, Color32, Frame};
use egui_dock::{DockArea, DockState, Style};
use tokio::sync::broadcast;
use tracing::trace_span;

use crate::{admin::AdminSite, database::SharedCatalog};

use super::tabs::entity_tabs::{entity_tab::EntityTab, entity_tab_viewer::EntityTabViewer};

#[derive(Default)]
pub enum AsyncStatus<T> {
    #[default]
    Loading,
    Ready(T),
}

/// One dock tab per model registered on the admin site.
pub struct MainWindow {
    dock_state: DockState<EntityTab>,
}

impl MainWindow {
    const CHANGES_CAPACITY: usize = 16;

    pub fn new(_: &eframe::CreationContext<'_>, catalog: SharedCatalog, site: &AdminSite) -> Self {
        let (changed_tx, _) = broadcast::channel(Self::CHANGES_CAPACITY);

        let tabs = site
            .models()
            .iter()
            .map(|model| EntityTab::new(model.clone(), Arc::clone(&catalog), changed_tx.clone()))
            .collect();

        Self {
            dock_state: DockState::new(tabs),
        }
    }
}

impl eframe::App for MainWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let span = trace_span!("update");
        let _guard = span.enter();

        let frame = Frame::default().fill(Color32::from_rgb(30, 25, 25));
        CentralPanel::default().frame(frame).show(ctx, |ui| {
            DockArea::new(&mut self.dock_state)
                .show_close_buttons(false)
                .style(Style::from_egui(ui.style().as_ref()))
                .show_inside(ui, &mut EntityTabViewer);
        });
    }
}
