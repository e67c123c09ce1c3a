use egui::{Ui, WidgetText};
use egui_dock::TabViewer;

use super::entity_tab::EntityTab;

pub struct EntityTabViewer;

impl TabViewer for EntityTabViewer {
    type Tab = EntityTab;

    fn ui(&mut self, ui: &mut Ui, tab: &mut Self::Tab) {
        tab.show(ui);
    }

    fn title(&mut self, tab: &mut Self::Tab) -> WidgetText {
        tab.title().into()
    }
}
