use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc,
};

use egui::{Color32, Context, Grid, ScrollArea, Ui};
use egui_modal::Modal;
use itertools::Itertools;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{trace, trace_span};

use crate::{
    admin::{forms::AdminForm, AdminRow, EntityKind, ModelAdmin},
    database::{catalog::Catalog, SharedCatalog},
    windows::main_window::AsyncStatus,
};

enum TabEvent {
    Rows(Result<Vec<AdminRow>, String>),
    Loaded(i32, Result<AdminForm, String>),
    Saved(Result<i32, String>),
    Deleted(i32, Result<String, String>),
}

enum Message {
    Info(String),
    Error(String),
}

/// List, create, change and delete records of one registered entity.
pub struct EntityTab {
    model: ModelAdmin,
    catalog: SharedCatalog,
    rows: AsyncStatus<Vec<AdminRow>>,
    needs_refresh: bool,
    form: AdminForm,
    editing: Option<i32>,
    pending_delete: Option<AdminRow>,
    message: Option<Message>,
    events_tx: Sender<TabEvent>,
    events_rx: Receiver<TabEvent>,
    // Any write in any tab, cascades included, invalidates every listing
    changed_tx: broadcast::Sender<EntityKind>,
    changed_rx: broadcast::Receiver<EntityKind>,
}

impl EntityTab {
    pub fn new(
        model: ModelAdmin,
        catalog: SharedCatalog,
        changed_tx: broadcast::Sender<EntityKind>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let form = AdminForm::blank(model.kind);
        let changed_rx = changed_tx.subscribe();

        Self {
            model,
            catalog,
            rows: AsyncStatus::default(),
            needs_refresh: true,
            form,
            editing: None,
            pending_delete: None,
            message: None,
            events_tx,
            events_rx,
            changed_tx,
            changed_rx,
        }
    }

    pub fn title(&self) -> &'static str {
        self.model.verbose_name_plural
    }

    pub fn show(&mut self, ui: &mut Ui) {
        let span = trace_span!("show entity tab", entity = self.model.verbose_name_plural);
        let _guard = span.enter();

        self.check_for_changes();
        self.check_for_events();

        if self.needs_refresh {
            self.needs_refresh = false;
            self.refresh(ui.ctx());
        }

        self.delete_modal_ui(ui.ctx());

        match &self.message {
            Some(Message::Info(text)) => {
                ui.colored_label(Color32::LIGHT_GREEN, text.as_str());
            }
            Some(Message::Error(text)) => {
                ui.colored_label(Color32::LIGHT_RED, text.as_str());
            }
            None => {}
        }

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.rows_ui(ui);
                ui.separator();
                self.form_ui(ui);
            });
    }

    fn rows_ui(&mut self, ui: &mut Ui) {
        let AsyncStatus::Ready(rows) = &self.rows else {
            ui.spinner();
            return;
        };

        let mut edit = None;
        let mut delete = None;

        if rows.is_empty() {
            ui.label(format!(
                "No {} yet.",
                self.model.verbose_name_plural.to_lowercase()
            ));
        } else {
            Grid::new((self.model.verbose_name_plural, "rows"))
                .striped(true)
                .show(ui, |ui| {
                    for column in self.model.list_display {
                        ui.strong(*column);
                    }
                    ui.end_row();

                    for row in rows {
                        for cell in &row.cells {
                            ui.label(cell.as_str());
                        }
                        if ui.button("Edit").clicked() {
                            edit = Some(row.id);
                        }
                        if ui.button("Delete").clicked() {
                            delete = Some(row.clone());
                        }
                        ui.end_row();
                    }
                });
        }

        if let Some(id) = edit {
            self.edit(ui.ctx(), id);
        }
        if let Some(row) = delete {
            self.pending_delete = Some(row);
            self.delete_modal(ui.ctx()).open();
        }
    }

    fn form_ui(&mut self, ui: &mut Ui) {
        let heading = match self.editing {
            Some(id) => format!("Change {} #{id}", self.model.verbose_name),
            None => format!("Add {}", self.model.verbose_name),
        };
        ui.heading(heading);

        Grid::new((self.model.verbose_name_plural, "form"))
            .num_columns(2)
            .show(ui, |ui| {
                for field in self.form.fields() {
                    ui.label(field.label);
                    if field.multiline {
                        ui.text_edit_multiline(field.value);
                    } else {
                        ui.text_edit_singleline(field.value);
                    }
                    ui.end_row();
                }
            });

        let mut save = false;
        let mut clear = false;
        ui.horizontal(|ui| {
            save = ui.button("Save").clicked();
            clear = ui.button("New").clicked();
        });

        if save {
            self.save(ui.ctx());
        } else if clear {
            self.clear_form();
        }
    }

    fn delete_modal(&self, ctx: &Context) -> Modal {
        Modal::new(ctx, format!("delete {}", self.model.verbose_name))
    }

    fn delete_modal_ui(&mut self, ctx: &Context) {
        let modal = self.delete_modal(ctx);

        let mut body = self
            .pending_delete
            .as_ref()
            .map(|row| format!("Delete {} \"{}\"?", self.model.verbose_name, row.display))
            .unwrap_or_default();
        if self.model.kind != EntityKind::RecipeIngredient {
            body.push_str(" Recipe ingredients that reference it are deleted too.");
        }

        let mut confirmed = false;
        modal.show(|ui| {
            modal.title(ui, format!("Delete {}", self.model.verbose_name));
            modal.frame(ui, |ui| {
                modal.body(ui, body.as_str());
            });
            modal.buttons(ui, |ui| {
                modal.button(ui, "Cancel");
                if modal.caution_button(ui, "Delete").clicked() {
                    confirmed = true;
                }
            });
        });

        if confirmed {
            if let Some(row) = self.pending_delete.take() {
                self.delete(ctx, row);
            }
        }
    }

    fn spawn<F>(&self, ctx: &Context, work: F)
    where
        F: FnOnce(&dyn Catalog) -> TabEvent + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let catalog = Arc::clone(&self.catalog);
        let ctx = ctx.clone();

        tokio::task::spawn_blocking(move || {
            let catalog: &dyn Catalog = catalog.as_ref();
            if tx.send(work(catalog)).is_err() {
                trace!("tab dropped before the catalog answered");
            }
            ctx.request_repaint();
        });
    }

    fn refresh(&mut self, ctx: &Context) {
        self.rows = AsyncStatus::Loading;

        let model = self.model.clone();
        self.spawn(ctx, move |catalog| {
            TabEvent::Rows(model.load_rows(catalog).map_err(|error| error.to_string()))
        });
    }

    fn edit(&mut self, ctx: &Context, id: i32) {
        let kind = self.model.kind;
        self.spawn(ctx, move |catalog| {
            TabEvent::Loaded(
                id,
                AdminForm::load(kind, catalog, id).map_err(|error| error.to_string()),
            )
        });
    }

    fn save(&mut self, ctx: &Context) {
        let form = self.form.clone();
        let editing = self.editing;
        self.spawn(ctx, move |catalog| {
            TabEvent::Saved(
                form.save(catalog, editing)
                    .map_err(|error| error.to_string()),
            )
        });
    }

    fn delete(&mut self, ctx: &Context, row: AdminRow) {
        let model = self.model.clone();
        self.spawn(ctx, move |catalog| {
            TabEvent::Deleted(
                row.id,
                model
                    .delete(catalog, row.id)
                    .map(|()| row.display)
                    .map_err(|error| error.to_string()),
            )
        });
    }

    fn clear_form(&mut self) {
        self.form = AdminForm::blank(self.model.kind);
        self.editing = None;
    }

    fn notify_changed(&self) {
        // No receivers only means no other tab is listening
        let _ = self.changed_tx.send(self.model.kind);
    }

    fn check_for_changes(&mut self) {
        loop {
            match self.changed_rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => self.needs_refresh = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn check_for_events(&mut self) {
        let events = self.events_rx.try_iter().collect_vec();

        for event in events {
            match event {
                TabEvent::Rows(Ok(rows)) => self.rows = AsyncStatus::Ready(rows),
                TabEvent::Rows(Err(error)) => {
                    self.rows = AsyncStatus::Ready(Vec::new());
                    self.message = Some(Message::Error(error));
                }
                TabEvent::Loaded(id, Ok(form)) => {
                    self.form = form;
                    self.editing = Some(id);
                    self.message = None;
                }
                TabEvent::Saved(Ok(id)) => {
                    self.message = Some(Message::Info(format!(
                        "Saved {} #{id}",
                        self.model.verbose_name
                    )));
                    self.clear_form();
                    self.notify_changed();
                }
                TabEvent::Deleted(id, Ok(display)) => {
                    self.message = Some(Message::Info(format!("Deleted \"{display}\"")));
                    if self.editing == Some(id) {
                        self.clear_form();
                    }
                    self.notify_changed();
                }
                TabEvent::Loaded(_, Err(error))
                | TabEvent::Saved(Err(error))
                | TabEvent::Deleted(_, Err(error)) => {
                    self.message = Some(Message::Error(error));
                }
            }
        }
    }
}
