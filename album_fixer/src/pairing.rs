// ============================================================================
// 🔗 Media ↔ JSON sidecar pairing
// ============================================================================
//
// Matching strategies, tried per media file in this order:
// 1. Exact: IMG_1.jpg.json → IMG_1.jpg
// 2. Stem: IMG_1.json → IMG_1.jpg
// 3. Magic path: cosmetic suffixes ("(1)", " Copy", "-edited", "-已編輯")
//    stripped from both names, then the sidecar's name must start with the
//    media's. Live-photo clips also drop their own extension so IMG_1.MOV
//    finds IMG_1.HEIC.json.
//
// A sidecar is claimed by at most one media file. Ties go to the first
// media file and the first sidecar in lexical file-name order.
//
// ============================================================================

use crate::media::{is_sidecar, MediaFile};
use crate::probe::MediaProbe;
use crate::sidecar::{SidecarError, SidecarRecord};
use lazy_static::lazy_static;
use regex::Regex;
use shared_utils::list_files;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

lazy_static! {
    static ref COSMETIC_SUFFIX: Regex =
        Regex::new(r"\(\d+\)| Copy|-edited|-已編輯").expect("cosmetic suffix regex should compile");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    Exact,
    Stem,
    Magic,
    Unmatched,
}

impl MatchKind {
    /// Summary box label
    pub fn label(&self) -> &'static str {
        match self {
            MatchKind::Exact => "🔗 Exact sidecar:",
            MatchKind::Stem => "🔗 Stem sidecar:",
            MatchKind::Magic => "🔗 Magic path:",
            MatchKind::Unmatched => "🔗 No sidecar:",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchKind::Exact => "exact",
            MatchKind::Stem => "stem",
            MatchKind::Magic => "magic_path",
            MatchKind::Unmatched => "no_match",
        };
        f.write_str(name)
    }
}

/// One media file and the sidecar it was paired with, if any
#[derive(Debug, Clone)]
pub struct Pairing {
    pub media: MediaFile,
    pub sidecar: Option<PathBuf>,
    pub matched_by: MatchKind,
}

/// What reading the paired sidecar produced
#[derive(Debug)]
pub enum SidecarLoad {
    Absent,
    Parsed(SidecarRecord),
    Malformed(SidecarError),
}

impl Pairing {
    pub fn load_record(&self) -> SidecarLoad {
        match &self.sidecar {
            None => SidecarLoad::Absent,
            Some(path) => match SidecarRecord::load(path) {
                Ok(record) => SidecarLoad::Parsed(record),
                Err(e) => SidecarLoad::Malformed(e),
            },
        }
    }
}

/// Normalized name used for fuzzy matching
pub fn magic_path(file_name: &str, live_photo: bool) -> String {
    let stripped = COSMETIC_SUFFIX.replace_all(file_name, "").to_string();
    if !live_photo {
        return stripped;
    }
    match stripped.rfind('.') {
        Some(idx) if idx > 0 => stripped[..idx].to_string(),
        _ => stripped,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

struct SidecarSlot {
    path: PathBuf,
    name: String,
    magic: String,
    claimed: bool,
}

pub struct PairResolver<'p, 'a> {
    probe: &'p MediaProbe<'a>,
}

impl<'p, 'a> PairResolver<'p, 'a> {
    pub fn new(probe: &'p MediaProbe<'a>) -> Self {
        Self { probe }
    }

    /// Pair every media file directly inside `dir`. Results follow the
    /// lexical order of the media file names.
    pub fn resolve(&self, dir: &Path) -> std::io::Result<Vec<Pairing>> {
        let files = list_files(dir)?;

        let mut media: Vec<MediaFile> = Vec::new();
        let mut sidecars: Vec<SidecarSlot> = Vec::new();
        for path in &files {
            if is_sidecar(path) {
                let name = file_name(path);
                sidecars.push(SidecarSlot {
                    path: path.clone(),
                    magic: magic_path(&name, false),
                    name,
                    claimed: false,
                });
            } else if let Some(m) = MediaFile::from_path(path) {
                media.push(m);
            }
        }

        let mut pairings: Vec<Pairing> = media
            .into_iter()
            .map(|m| Pairing {
                media: m,
                sidecar: None,
                matched_by: MatchKind::Unmatched,
            })
            .collect();

        // Strategy 1: exact <media name>.json
        for pairing in pairings.iter_mut() {
            let wanted = format!("{}.json", pairing.media.file_name());
            if let Some(slot) = claim(&mut sidecars, |s| s.name.eq_ignore_ascii_case(&wanted)) {
                pairing.sidecar = Some(slot);
                pairing.matched_by = MatchKind::Exact;
            }
        }

        // Strategy 2: <stem>.json
        for pairing in pairings.iter_mut().filter(|p| p.sidecar.is_none()) {
            let Some(stem) = pairing.media.path().file_stem() else {
                continue;
            };
            let wanted = format!("{}.json", stem.to_string_lossy());
            if let Some(slot) = claim(&mut sidecars, |s| s.name.eq_ignore_ascii_case(&wanted)) {
                pairing.sidecar = Some(slot);
                pairing.matched_by = MatchKind::Stem;
            }
        }

        // Strategy 3: magic path over what is still unclaimed
        for pairing in pairings.iter_mut().filter(|p| p.sidecar.is_none()) {
            let live = self.probe.is_live_photo(&pairing.media);
            if live {
                pairing.media = pairing.media.clone().with_live_photo(true);
            }
            let key = magic_path(&pairing.media.file_name(), live);
            if key.is_empty() {
                continue;
            }
            if let Some(slot) = claim(&mut sidecars, |s| s.magic.starts_with(&key)) {
                debug!(
                    media = %pairing.media.path().display(),
                    sidecar = %slot.display(),
                    live_photo = live,
                    "Paired by magic path"
                );
                pairing.sidecar = Some(slot);
                pairing.matched_by = MatchKind::Magic;
            }
        }

        for pairing in pairings.iter().filter(|p| p.sidecar.is_none()) {
            info!("⚠️  No sidecar for {}", pairing.media.path().display());
        }
        for slot in sidecars.iter().filter(|s| !s.claimed) {
            info!("⚠️  Sidecar without media: {}", slot.path.display());
        }

        Ok(pairings)
    }
}

/// First unclaimed sidecar matching `pred`, marked as claimed
fn claim<F>(sidecars: &mut [SidecarSlot], pred: F) -> Option<PathBuf>
where
    F: Fn(&SidecarSlot) -> bool,
{
    let slot = sidecars.iter_mut().find(|s| !s.claimed && pred(s))?;
    slot.claimed = true;
    Some(slot.path.clone())
}
