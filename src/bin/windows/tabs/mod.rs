pub mod entity_tabs;
