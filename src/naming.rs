//! Local names for downloaded datasets and members.
//!
//! Members and sequential datasets land under lowercase names unless the
//! original letter case is preserved. An extension is appended when one is
//! configured, picked per low-level qualifier (LLQ) from the extension map or
//! else from the default. USS paths keep their names.

use std::collections::BTreeMap;

use crate::model::Candidate;

const MAX_DATASET_NAME: usize = 44;
const MAX_QUALIFIER: usize = 8;

/// True for a qualified dataset name such as `HLQ.SRC.PDS` (case-insensitive).
pub fn is_dataset_name(name: &str) -> bool {
    name.len() <= MAX_DATASET_NAME && name.contains('.') && name.split('.').all(is_qualifier)
}

fn is_qualifier(q: &str) -> bool {
    let national = |c: char| matches!(c, '#' | '@' | '$');
    let mut chars = q.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    q.len() <= MAX_QUALIFIER
        && (first.is_ascii_alphabetic() || national(first))
        && chars.all(|c| c.is_ascii_alphanumeric() || national(c) || c == '-')
}

/// How dataset items are named on the local side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalNaming {
    pub preserve_original_letter_case: bool,
    /// Extension for every downloaded dataset item, without the dot.
    pub extension: Option<String>,
    /// LLQ to extension; wins over `extension`. Keys match case-insensitively.
    pub extension_map: BTreeMap<String, String>,
}

impl LocalNaming {
    /// Destination path for `candidate`, or `None` when it keeps its relative path.
    pub fn target_for(&self, candidate: &Candidate) -> Option<String> {
        let dataset = candidate.dataset.as_deref()?;
        let mut target = if self.preserve_original_letter_case {
            candidate.relative_path.clone()
        } else {
            candidate.relative_path.to_lowercase()
        };
        if !candidate.is_directory
            && let Some(ext) = self.extension_for(dataset)
        {
            target.push('.');
            target.push_str(ext);
        }
        (target != candidate.relative_path).then_some(target)
    }

    fn extension_for(&self, dataset: &str) -> Option<&str> {
        let llq = dataset.rsplit('.').next().unwrap_or(dataset);
        self.extension_map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(llq))
            .map(|(_, v)| v)
            .or(self.extension.as_ref())
            .map(|e| e.trim_start_matches('.'))
            .filter(|e| !e.is_empty())
    }
}

/// Parse `llq=ext[,llq=ext...]`, e.g. `cbl=cob,cntl=jcl`.
pub fn parse_extension_map(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let mut map = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((llq, ext)) = pair.split_once('=') else {
            return Err(format!("expected LLQ=EXTENSION, found '{pair}'"));
        };
        let (llq, ext) = (llq.trim(), ext.trim());
        if llq.is_empty() || ext.is_empty() {
            return Err(format!("expected LLQ=EXTENSION, found '{pair}'"));
        }
        map.insert(llq.to_string(), ext.to_string());
    }
    Ok(map)
}
