pub mod entity_tab;
pub mod entity_tab_viewer;
