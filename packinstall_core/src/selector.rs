use std::collections::HashSet;

use log::warn;
use reqwest::Client;
use serde::Deserialize;

use crate::{http::get_json, manifest::ManifestFile, ClientEnv};

/// A client-optional manifest file offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalFile {
    /// Display name, the project title when it could be looked up.
    pub label: String,
    /// Manifest path, the value handed back by a selector.
    pub path: String,
}

/// Decides which optional files get installed.
pub trait OptionalFileSelector: Send + Sync {
    /// Returns the `path`s of the candidates to install. Anything not
    /// returned is skipped without being downloaded.
    fn select(&self, candidates: &[OptionalFile]) -> HashSet<String>;
}

pub struct SelectAll;

impl OptionalFileSelector for SelectAll {
    fn select(&self, candidates: &[OptionalFile]) -> HashSet<String> {
        candidates.iter().map(|file| file.path.clone()).collect()
    }
}

pub struct SelectNone;

impl OptionalFileSelector for SelectNone {
    fn select(&self, _: &[OptionalFile]) -> HashSet<String> {
        HashSet::new()
    }
}

/// Selects a fixed set of manifest paths.
pub struct SelectPaths(pub HashSet<String>);

impl OptionalFileSelector for SelectPaths {
    fn select(&self, candidates: &[OptionalFile]) -> HashSet<String> {
        candidates
            .iter()
            .filter(|file| self.0.contains(&file.path))
            .map(|file| file.path.clone())
            .collect()
    }
}

#[derive(Deserialize)]
struct ProjectTitle {
    title: String,
}

/// Collects the client-optional files of a manifest with their display labels.
///
/// A failed label lookup falls back to the manifest path; labels are
/// presentational and never abort an install.
pub async fn optional_candidates(
    client: &Client,
    api: &str,
    files: &[ManifestFile],
) -> Vec<OptionalFile> {
    let mut candidates = Vec::new();
    for file in files
        .iter()
        .filter(|file| file.client_env() == ClientEnv::Optional)
    {
        let label = match lookup_title(client, api, file).await {
            Some(title) => title,
            None => file.path.clone(),
        };
        candidates.push(OptionalFile {
            label,
            path: file.path.clone(),
        });
    }
    candidates
}

async fn lookup_title(client: &Client, api: &str, file: &ManifestFile) -> Option<String> {
    let Some(project_id) = file.project_id() else {
        warn!("No project id in downloads of {}", file.path);
        return None;
    };
    match get_json::<ProjectTitle>(client, &format!("{}/project/{}", api, project_id)).await {
        Ok(project) => Some(project.title),
        Err(err) => {
            warn!("Could not look up project {} for {}: {}", project_id, file.path, err);
            None
        }
    }
}
