//! Kata catalog types and lookup.
//!
//! The catalog is decoded once and never mutated afterwards, so a single
//! `&Catalog` can be shared by every concurrent grading run.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One assertion: a call expression and the text its result must print as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Assertion {
    pub call: String,
    pub expected: String,
}

/// A named exercise with its ordered assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Kata {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "visible_skeleton")]
    pub skeleton: String,
    #[serde(default, rename = "test_cases")]
    pub assertions: Vec<Assertion>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    katas: Vec<Kata>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("kata not found")]
pub struct KataNotFound {
    pub slug: String,
}

/// Read-only, ordered collection of katas.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    katas: Vec<Kata>,
}

impl Catalog {
    pub fn new(katas: Vec<Kata>) -> Result<Self, CatalogError> {
        validate_katas(&katas)?;
        Ok(Self { katas })
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Self::new(file.katas)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            katas = catalog.katas.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn find(&self, slug: &str) -> Result<&Kata, KataNotFound> {
        self.katas
            .iter()
            .find(|kata| kata.slug == slug)
            .ok_or_else(|| KataNotFound {
                slug: slug.to_string(),
            })
    }

    pub fn katas(&self) -> &[Kata] {
        &self.katas
    }
}

fn validate_katas(katas: &[Kata]) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for kata in katas {
        if kata.slug.trim().is_empty() {
            return Err(CatalogError::Invalid(format!(
                "kata {:?} has an empty slug",
                kata.title
            )));
        }
        if !seen.insert(kata.slug.as_str()) {
            return Err(CatalogError::Invalid(format!(
                "duplicate kata slug {:?}",
                kata.slug
            )));
        }
        for (idx, assertion) in kata.assertions.iter().enumerate() {
            if assertion.call.trim().is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "kata {:?} test case {idx} has an empty call",
                    kata.slug
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn kata(slug: &str, assertions: &[(&str, &str)]) -> Kata {
    Kata {
        slug: slug.to_string(),
        title: slug.to_string(),
        description: String::new(),
        skeleton: String::new(),
        assertions: assertions
            .iter()
            .map(|(call, expected)| Assertion {
                call: call.to_string(),
                expected: expected.to_string(),
            })
            .collect(),
    }
}
