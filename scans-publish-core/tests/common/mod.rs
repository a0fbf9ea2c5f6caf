#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scans_publish_core::outcome::{Failure, Outcome};
use scans_publish_core::state::{LinkKind, PublishState, ReleaseInfo};
use scans_publish_core::{CancellationFlag, Step};

/// Shared journal of step executions and undos, in call order.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// What a [`RecordingStep`] does when executed.
#[derive(Clone)]
pub enum Behaviour {
    Succeed,
    SetLink(LinkKind, String),
    Fail(Failure),
    CancelThenSucceed(CancellationFlag),
}

/// Test step that writes `execute:<name>` / `undo:<name>` into a journal.
pub struct RecordingStep {
    pub name: String,
    pub behaviour: Behaviour,
    pub journal: Journal,
    pub invalid: Option<Failure>,
    pub undo_failure: Option<Failure>,
}

impl RecordingStep {
    pub fn new(name: &str, behaviour: Behaviour, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            behaviour,
            journal: journal.clone(),
            invalid: None,
            undo_failure: None,
        }
    }

    pub fn invalid(mut self, failure: Failure) -> Self {
        self.invalid = Some(failure);
        self
    }

    pub fn failing_undo(mut self, failure: Failure) -> Self {
        self.undo_failure = Some(failure);
        self
    }
}

#[async_trait]
impl Step for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Outcome<()> {
        match &self.invalid {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    async fn execute(&self, state: &mut PublishState, cancel: &CancellationFlag) -> Outcome<()> {
        cancel.check(&self.name)?;
        self.journal
            .lock()
            .unwrap()
            .push(format!("execute:{}", self.name));
        match &self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::SetLink(kind, url) => state.links.set(*kind, url.clone()),
            Behaviour::Fail(failure) => Err(failure.clone()),
            Behaviour::CancelThenSucceed(flag) => {
                flag.cancel();
                Ok(())
            }
        }
    }

    async fn undo(&self, _state: &PublishState) -> Outcome<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("undo:{}", self.name));
        match &self.undo_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

pub fn release() -> ReleaseInfo {
    ReleaseInfo {
        display_title: "My Title!".to_string(),
        chapter_number: "10".to_string(),
        chapter_name: None,
        chapter_volume: None,
        message: Some("line1\nline2".to_string()),
    }
}

/// Writes a small solid-colour PNG and returns its path.
pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))
        .save(path)
        .expect("write test png");
    path.to_path_buf()
}

/// Creates `<base>/config/blogger-template.html` with `template` and returns the config dir.
pub fn write_template(base: &Path, template: &str) -> PathBuf {
    let config_dir = base.join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("blogger-template.html"), template).unwrap();
    config_dir
}
