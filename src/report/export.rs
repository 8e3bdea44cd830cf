//! Export orchestration: artifact naming, renderer sequencing and the manifest.
//!
//! One export reads one payload, builds one Document and writes three files
//! next to each other. Renderers run in a fixed order (HTML, PDF, Markdown)
//! and each file is written as soon as its bytes exist, so a later failure
//! never rolls back an earlier file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use super::pdf::layout::PageGeometry;
use super::{HtmlRenderer, OutputFormat, PdfRenderer, Renderer, TextRenderer};
use crate::adapter::{ReportKind, ReportProfile, check_palette, resolve_kind};
use crate::error::ExportError;
use crate::payload::Fields;
use crate::rules::RuleBook;

/// Longest slug kept in an artifact stem.
const MAX_SLUG_LEN: usize = 60;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Forced report kind; inferred from the payload's `type` when absent.
    pub kind: Option<ReportKind>,
    /// Rule-book override merged over the built-in rules.
    pub rules: Option<PathBuf>,
    /// Page layout of the printable output.
    pub page: PageGeometry,
    /// Keep writing the other formats when one renderer fails.
    pub isolate_renderers: bool,
}

/// Result of one export, printed as JSON on stdout.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub html: Option<String>,
    pub pdf: Option<String>,
    pub md: Option<String>,
    pub output_folder: String,
    pub kind: &'static str,
    #[serde(flatten)]
    pub summary: Map<String, Value>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<&'static str, String>,
}

impl Manifest {
    fn set_path(&mut self, format: OutputFormat, path: &Path) {
        let path = Some(path.display().to_string());
        match format {
            OutputFormat::Styled => self.html = path,
            OutputFormat::Printable => self.pdf = path,
            OutputFormat::PlainText => self.md = path,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Where the three artifacts of one export go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub folder: PathBuf,
    pub stem: String,
}

impl ArtifactPaths {
    pub fn file(&self, format: OutputFormat) -> PathBuf {
        self.folder.join(format!("{}.{}", self.stem, format.extension()))
    }
}

/// Read and parse the payload file. The root must be a JSON object.
pub fn load_payload(path: &Path) -> Result<Value, ExportError> {
    if !path.is_file() {
        return Err(ExportError::InputNotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path).map_err(|source| ExportError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| ExportError::InvalidPayload { path: path.to_path_buf(), detail: e.to_string() })?;
    if !value.is_object() {
        return Err(ExportError::InvalidPayload {
            path: path.to_path_buf(),
            detail: "top-level value must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

/// Lowercase ASCII slug with `-` between alphanumeric runs.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    let clamped: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let trimmed = clamped.trim_matches('-');
    if trimmed.is_empty() { "untitled".to_string() } else { trimmed.to_string() }
}

fn sanitize(text: &str, keep: impl Fn(char) -> bool) -> String {
    text.chars().filter(|c| keep(*c)).collect()
}

/// Date prefix of the stem: the payload's own date when it has one, else today.
pub fn stem_date(payload: Fields<'_>) -> String {
    let declared = ["date", "generated_date"].iter().find_map(|key| payload.get(key).as_text());
    if let Some(declared) = declared {
        // Only the calendar part of a timestamp such as 2025-01-15T10:30:00.
        let date: String = sanitize(&declared, |c| c.is_ascii_alphanumeric() || c == '-').chars().take(10).collect();
        if !date.is_empty() {
            return date;
        }
        debug!("payload date '{}' has no usable characters, using today", declared);
    }
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Compute the artifact stem for a payload, e.g. `2025-01-15_ai-meal-planner_standard_Analysis`.
pub fn artifact_stem(profile: &dyn ReportProfile, payload: Fields<'_>) -> String {
    let suffix = sanitize(&profile.stem_suffix(payload), |c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let mut stem = format!("{}_{}", stem_date(payload), slugify(&profile.stem_subject(payload)));
    if !suffix.is_empty() {
        stem.push('_');
        stem.push_str(&suffix);
    }
    stem
}

/// Create the profile's folder under `output_dir` and name the artifacts.
pub fn compute_paths(
    profile: &dyn ReportProfile,
    payload: Fields<'_>,
    output_dir: &Path,
) -> Result<ArtifactPaths, ExportError> {
    let folder = output_dir.join(profile.folder());
    fs::create_dir_all(&folder).map_err(|source| ExportError::Io { action: "create", path: folder.clone(), source })?;
    Ok(ArtifactPaths { folder, stem: artifact_stem(profile, payload) })
}

/// Run one full export of the payload at `input`.
///
/// Returns the manifest. Without renderer isolation the first renderer
/// failure is returned as an error; files written before it stay on disk.
pub fn run_export(input: &Path, options: &ExportOptions) -> Result<Manifest, ExportError> {
    let payload = load_payload(input)?;
    let fields = Fields::new(&payload);
    let rules = RuleBook::load(options.rules.as_deref())?;

    let (kind, warnings) = resolve_kind(options.kind, fields);
    for warning in &warnings {
        warn!("{}", warning);
    }
    let profile = kind.profile();
    let palette = rules.palette(kind.rule_table())?;
    check_palette(profile, palette)?;

    let doc = profile.build(fields, palette)?;
    debug!("built {} document with {} section(s)", kind.as_str(), doc.sections.len());

    let paths = compute_paths(profile, fields, &options.output_dir)?;
    info!("exporting {} report to {}", kind.as_str(), paths.folder.display());

    let mut manifest = Manifest {
        html: None,
        pdf: None,
        md: None,
        output_folder: paths.folder.display().to_string(),
        kind: kind.as_str(),
        summary: profile.summary(fields),
        warnings,
        failures: BTreeMap::new(),
    };

    let renderers: [Box<dyn Renderer>; 3] =
        [Box::new(HtmlRenderer), Box::new(PdfRenderer::new(options.page.clone())), Box::new(TextRenderer)];
    for renderer in &renderers {
        let format = renderer.format();
        let bytes = match renderer.render(&doc) {
            Ok(bytes) => bytes,
            Err(source) if options.isolate_renderers => {
                warn!("{} renderer failed: {}", format.extension(), source);
                manifest.failures.insert(format.extension(), source.to_string());
                continue;
            }
            Err(source) => return Err(ExportError::Render { format: format.extension(), source }),
        };
        let path = paths.file(format);
        fs::write(&path, &bytes).map_err(|source| ExportError::Io { action: "write", path: path.clone(), source })?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        manifest.set_path(format, &path);
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::pdf::layout::PageSize;
    use serde_json::json;
    use std::io::Write;

    fn options(dir: &Path) -> ExportOptions {
        ExportOptions {
            output_dir: dir.to_path_buf(),
            kind: None,
            rules: None,
            page: PageGeometry::new(PageSize::Letter),
            isolate_renderers: false,
        }
    }

    fn write_payload(dir: &Path, payload: &Value) -> PathBuf {
        let path = dir.join("payload.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", payload).unwrap();
        path
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Business Idea!! 2024"), "my-business-idea-2024");
        assert_eq!(slugify("  --Toyota RAV4--  "), "toyota-rav4");
        assert_eq!(slugify("Caf\u{e9} cr\u{e8}me"), "caf-cr-me");
        assert_eq!(slugify(""), "untitled");
        assert_eq!(slugify("!!!"), "untitled");
    }

    #[test]
    fn test_slugify_clamps_without_trailing_dash() {
        let long = format!("{} tail", "a".repeat(59));
        let slug = slugify(&long);
        assert_eq!(slug, "a".repeat(59));
        assert!(slugify(&"word ".repeat(40)).len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn test_stem_date_prefers_payload_date() {
        let payload = json!({"generated_date": "2025-01-15T10:30:00"});
        assert_eq!(stem_date(Fields::new(&payload)), "2025-01-15");
        let payload = json!({"date": "2024/03/09"});
        assert_eq!(stem_date(Fields::new(&payload)), "20240309");
    }

    #[test]
    fn test_stem_date_defaults_to_today() {
        let payload = json!({"date": "///"});
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(stem_date(Fields::new(&payload)), today);
    }

    #[test]
    fn test_artifact_stem_for_business_payload() {
        let payload = json!({"date": "2025-01-15", "idea_description": "AI Meal Planner", "depth": "deep"});
        let stem = artifact_stem(ReportKind::BusinessAnalysis.profile(), Fields::new(&payload));
        assert_eq!(stem, "2025-01-15_ai-meal-planner_deep_Analysis");
    }

    #[test]
    fn test_load_payload_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_payload(&missing), Err(ExportError::InputNotFound(_))));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{\"type\": ").unwrap();
        match load_payload(&broken) {
            Err(ExportError::InvalidPayload { detail, .. }) => assert!(detail.contains("line 1")),
            other => panic!("expected InvalidPayload, got {:?}", other),
        }

        let array = dir.path().join("array.json");
        fs::write(&array, "[1, 2]").unwrap();
        assert!(matches!(load_payload(&array), Err(ExportError::InvalidPayload { .. })));
    }

    #[test]
    fn test_run_export_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let payload = json!({
            "type": "code_review",
            "project_name": "Demo Service",
            "date": "2025-02-01",
            "production_readiness_score": 74,
            "verdict": "PASS_WITH_WARNINGS",
            "issues": [{"id": "CR-1", "severity": "HIGH", "title": "Unbounded retry loop"}]
        });
        let input = write_payload(dir.path(), &payload);
        let manifest = run_export(&input, &options(dir.path())).unwrap();

        assert_eq!(manifest.kind, "code-review");
        assert!(manifest.warnings.is_empty());
        assert!(manifest.is_complete());
        let folder = dir.path().join("Code_Reviews");
        assert_eq!(manifest.output_folder, folder.display().to_string());
        for (path, ext) in [(&manifest.html, "html"), (&manifest.pdf, "pdf"), (&manifest.md, "md")] {
            let path = PathBuf::from(path.as_ref().unwrap());
            assert!(path.is_file());
            assert_eq!(
                path.file_name().unwrap().to_string_lossy(),
                format!("2025-02-01_demo-service_Code_Review.{}", ext)
            );
        }

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["score"], 74);
        assert!(json.get("failures").is_none());
    }

    fn review_payload() -> Value {
        json!({
            "type": "code_review",
            "project_name": "Cramped Pages",
            "date": "2025-02-01",
            "production_readiness_score": 55,
            "verdict": "FAIL",
            "issues": [{"id": "CR-9", "severity": "CRITICAL", "title": "Secrets in logs"}]
        })
    }

    /// Options whose page body cannot hold a single heading, so the PDF renderer fails.
    fn cramped_options(dir: &Path) -> ExportOptions {
        let mut opts = options(dir);
        opts.page = PageGeometry::with_body_height(PageSize::Letter, 3.0);
        opts
    }

    #[test]
    fn test_renderer_failure_stops_later_formats() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_payload(dir.path(), &review_payload());
        let err = run_export(&input, &cramped_options(dir.path())).unwrap_err();
        assert!(matches!(err, ExportError::Render { format: "pdf", .. }), "{}", err);

        let folder = dir.path().join("Code_Reviews");
        let stem = "2025-02-01_cramped-pages_Code_Review";
        // Files written before the failure stay on disk.
        assert!(folder.join(format!("{}.html", stem)).is_file());
        assert!(!folder.join(format!("{}.pdf", stem)).exists());
        assert!(!folder.join(format!("{}.md", stem)).exists());
    }

    #[test]
    fn test_isolated_renderer_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_payload(dir.path(), &review_payload());
        let mut opts = cramped_options(dir.path());
        opts.isolate_renderers = true;
        let manifest = run_export(&input, &opts).unwrap();

        assert!(!manifest.is_complete());
        assert_eq!(manifest.failures.keys().copied().collect::<Vec<_>>(), vec!["pdf"]);
        assert!(manifest.failures["pdf"].contains("mm of body space"));
        assert!(manifest.pdf.is_none());
        for path in [&manifest.html, &manifest.md] {
            assert!(PathBuf::from(path.as_ref().unwrap()).is_file());
        }

        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json["failures"]["pdf"].is_string());
        assert!(json["pdf"].is_null());
    }

    #[test]
    fn test_forced_kind_records_mismatch_warning() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_payload(dir.path(), &json!({"type": "code_review", "directory_name": "Plumbers"}));
        let mut opts = options(dir.path());
        opts.kind = Some(ReportKind::Directory);
        let manifest = run_export(&input, &opts).unwrap();
        assert_eq!(manifest.kind, "directory");
        assert_eq!(manifest.warnings.len(), 1);
        assert!(dir.path().join("Directory_Creator").is_dir());
    }

    #[test]
    fn test_override_missing_a_scale_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_payload(dir.path(), &json!({"type": "vehicle_inventory"}));
        let rules = dir.path().join("rules.toml");
        fs::write(
            &rules,
            "[kinds.vehicle-inventory]\naccent = \"#059669\"\n\n[[kinds.vehicle-inventory.scores.score]]\n\
             threshold = 0\nbackground = \"#FFFFFF\"\ntext = \"#000000\"\nlabel = \"Any\"\n",
        )
        .unwrap();
        let mut opts = options(dir.path());
        opts.rules = Some(rules);
        let err = run_export(&input, &opts).unwrap_err();
        assert!(err.to_string().contains("no enum scale named 'deal'"), "{}", err);
        assert!(!dir.path().join("Vehicle_Inventory").exists());
    }

    #[test]
    fn test_unknown_rules_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_payload(dir.path(), &json!({"type": "code_review"}));
        let mut opts = options(dir.path());
        opts.rules = Some(dir.path().join("nope.toml"));
        assert!(matches!(run_export(&input, &opts), Err(ExportError::Rules(_))));
    }
}
