//! Inspection session.
//!
//! The [`Inspector`] is what a presentation layer holds on to: the document,
//! the current settings and the context of the last completed run.

use chrono::NaiveDateTime;

use crate::document::{Document, FsLoader, NodeId, SourceLoader};
use crate::error::InspectError;
use crate::export::{self, ExportDocument};
use crate::settings::{validate, Settings};

use super::context::RunContext;
use super::request::RunRequest;
use super::scheduler::Scheduler;
use super::types::RecordLookup;

pub struct Inspector {
    document: Document,
    loader: Box<dyn SourceLoader>,
    settings: Settings,
    context: Option<RunContext>,
}

impl Inspector {
    /// Inspector reading linked resources next to the document.
    pub fn new(document: Document) -> Self {
        let loader = FsLoader::for_document(&document);
        Self {
            document,
            loader: Box::new(loader),
            settings: Settings::default(),
            context: None,
        }
    }

    pub fn with_loader<L: SourceLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Run an analysis pass. The previous run is discarded before the new
    /// one starts, so an interrupted run leaves no context behind.
    pub async fn run(
        &mut self,
        request: &RunRequest,
        scheduler: &Scheduler,
    ) -> Result<&RunContext, InspectError> {
        self.context = None;
        validate(&self.settings)?;
        let context = scheduler
            .run(&self.document, self.loader.as_ref(), request, &self.settings)
            .await?;
        Ok(self.context.insert(context))
    }

    /// The last completed run, if any.
    pub fn context(&self) -> Option<&RunContext> {
        self.context.as_ref()
    }

    pub fn record(&self, node: NodeId) -> RecordLookup<'_> {
        match &self.context {
            Some(context) => context.lookup(node),
            None => RecordLookup::NotAnalyzed,
        }
    }

    /// Select an analyzed node for computed-style display and export.
    pub fn select(&mut self, node: NodeId) -> RecordLookup<'_> {
        let Some(context) = self.context.as_mut() else {
            return RecordLookup::NotAnalyzed;
        };
        if context.contains(node) {
            context.selected = Some(node);
        }
        context.lookup(node)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Change one setting. Applies to the next run; the current context
    /// keeps the settings it ran with.
    pub fn update_setting(&mut self, key: &str, value: &str) -> Result<(), InspectError> {
        let mut updated = self.settings.clone();
        updated.set(key, value)?;
        validate(&updated)?;
        self.settings = updated;
        Ok(())
    }

    pub fn reset_settings(&mut self) {
        self.settings = Settings::default();
    }

    /// Export documents for the last completed run.
    pub fn export(&self, timestamp: NaiveDateTime) -> Result<Vec<ExportDocument>, InspectError> {
        let context = self
            .context
            .as_ref()
            .filter(|context| context.is_complete())
            .ok_or(InspectError::NoCompletedRun)?;
        Ok(export::export_run(&self.document, context, timestamp))
    }

    /// CSS analysis of the selected node (the root until another is selected).
    pub fn export_selected(&self, timestamp: NaiveDateTime) -> Result<ExportDocument, InspectError> {
        let context = self
            .context
            .as_ref()
            .filter(|context| context.is_complete())
            .ok_or(InspectError::NoCompletedRun)?;
        let record = context
            .selected_record()
            .ok_or(InspectError::NoCompletedRun)?;
        Ok(export::element_document(
            &self.document,
            record,
            &context.settings,
            timestamp,
        ))
    }
}
