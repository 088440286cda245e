//! Report generation: normalize, build, assemble, render, save, clean up

use std::fs;
use std::path::PathBuf;

use docx_engine::{cleanup_file, DocxTemplate, PageCleanup};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analogs::{ANALOG_MARKER_RE, MAX_ANALOGS};
use crate::config::GeneratorConfig;
use crate::context::{assemble_context, AnalogBlock, AttachmentGroup, ContextInputs};
use crate::error::Result;
use crate::form::{AppraisalForm, FormUploads};
use crate::photos::{build_appendix_entries, build_photo_block};
use crate::record::{AppraisalRecord, RecordSources};
use crate::session::AppraisalSession;
use crate::upload::{normalize_uploads, NormalizedUploads, UploadHandle};

const REPORT_PREFIX: &str = "Отчёт";
const NO_CONTRACT_NUMBER: &str = "без_номера";

/// `Отчёт_<contract_no|без_номера>_<user_id>.docx`
pub fn report_file_name(contract_no: &str, user_id: &str) -> String {
    let contract = contract_no.trim();
    let contract = if contract.is_empty() {
        NO_CONTRACT_NUMBER.to_string()
    } else {
        contract
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect()
    };
    format!("{}_{}_{}.docx", REPORT_PREFIX, contract, user_id)
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Every upload read failure and image embedding failure
    pub warnings: Vec<String>,
    pub record: AppraisalRecord,
    pub removed_page_blocks: usize,
}

pub struct ReportGenerator {
    config: GeneratorConfig,
    cleanup: PageCleanup,
}

impl ReportGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            cleanup: PageCleanup::new(ANALOG_MARKER_RE.clone()),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate<H: UploadHandle>(
        &self,
        session: &AppraisalSession,
        form: &AppraisalForm,
        uploads: &FormUploads<H>,
    ) -> Result<GeneratedReport> {
        let profile = session.require_profile()?;
        form.validate()?;
        info!("Generating report for user {}", profile.user_id);

        let mut warnings = Vec::new();
        let object_photos = normalize_uploads(&uploads.object_photos);
        let appendix_1 = normalize_uploads(&uploads.appendix_1);
        let appendix_2 = normalize_uploads(&uploads.appendix_2);
        let rights = normalize_uploads(&uploads.rights_documents);

        let mut snapshots = session.analogs.snapshot_for_render();
        snapshots.truncate(MAX_ANALOGS);
        let analog_count = snapshots.len();

        let cfg = &self.config;
        let (object_grid, grid_failures) = build_photo_block(
            &object_photos.accepted,
            cfg.photo_columns,
            Some(cfg.object_photos_empty_message.as_str()),
            cfg.photo_width_mm,
        );
        record_failures(&mut warnings, "Фото объекта", &object_photos.failures);
        record_failures(&mut warnings, "Фото объекта", &grid_failures);

        let group_1 = attachment_group("Приложение 1", &appendix_1, cfg.appendix_width_mm, &mut warnings);
        let group_2 = attachment_group("Приложение 2", &appendix_2, cfg.appendix_width_mm, &mut warnings);
        let group_rights = attachment_group(
            "Правоустанавливающие документы",
            &rights,
            cfg.appendix_width_mm,
            &mut warnings,
        );

        let analog_blocks: Vec<AnalogBlock> = snapshots
            .iter()
            .map(|snapshot| {
                let label = format!("Аналог {}", snapshot.index);
                let (photos, failures) =
                    build_photo_block(&snapshot.files, cfg.photo_columns, None, cfg.photo_width_mm);
                record_failures(&mut warnings, &label, &snapshot.failures);
                record_failures(&mut warnings, &label, &failures);
                AnalogBlock {
                    snapshot: snapshot.clone(),
                    photos,
                }
            })
            .collect();

        let record = AppraisalRecord::collect(RecordSources {
            profile,
            form,
            object_photos: &object_photos,
            appendix_1: &appendix_1,
            appendix_2: &appendix_2,
            rights_documents: &rights,
            analogs: &snapshots,
        });

        let ctx = assemble_context(ContextInputs {
            form,
            object_photos: object_grid,
            appendix_1: group_1,
            appendix_2: group_2,
            rights: group_rights,
            analogs: analog_blocks,
        });
        debug!("Assembled {} placeholders", ctx.len());

        let template = DocxTemplate::open(&cfg.template_path)?;
        let rendered = template.render(&ctx)?;

        let file_name = report_file_name(&form.contract_no, &profile.user_id);
        let path = cfg.output_dir.join(&file_name);
        rendered.save(&path)?;
        info!("Saved {} ({} images)", path.display(), rendered.images_embedded());

        let removed_page_blocks = match cleanup_file(&path, &self.cleanup, analog_count) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Page cleanup skipped for {}: {}", path.display(), e);
                0
            }
        };

        let bytes = fs::read(&path)?;
        if !warnings.is_empty() {
            warn!("Report generated with {} warnings", warnings.len());
        }

        Ok(GeneratedReport {
            path,
            file_name,
            bytes,
            warnings,
            record,
            removed_page_blocks,
        })
    }
}

fn record_failures(warnings: &mut Vec<String>, label: &str, failures: &[String]) {
    warnings.extend(failures.iter().map(|f| format!("{}: {}", label, f)));
}

fn attachment_group(
    label: &str,
    normalized: &NormalizedUploads,
    width_mm: f64,
    warnings: &mut Vec<String>,
) -> AttachmentGroup {
    let (entries, failures) = build_appendix_entries(&normalized.accepted, width_mm);
    record_failures(warnings, label, &normalized.failures);
    record_failures(warnings, label, &failures);
    AttachmentGroup {
        uploads: normalized.clone(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppraisalError;
    use crate::photos::test_support::png;
    use crate::upload::RawUpload;
    use chrono::NaiveDate;
    use docx_engine::package::DOCUMENT_PART;
    use docx_engine::{DocxError, DocxPackage};
    use pretty_assertions::assert_eq;

    fn paragraph(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

    fn template_body() -> String {
        let mut body = String::new();
        body.push_str(&paragraph("Отчёт № {{ otchet_number }} по договору {{ contract_number }}"));
        body.push_str(&paragraph("{{ object_ocenki }}"));
        body.push_str(PAGE_BREAK);
        for n in 1..=MAX_ANALOGS {
            body.push_str(&paragraph(&format!("{{{{ object_analog{} }}}}", n)));
            body.push_str(&paragraph(&format!("{{{{ a_source{} }}}}", n)));
            body.push_str(&paragraph(&format!("{{{{ object_analog{}_photo }}}}", n)));
            body.push_str(PAGE_BREAK);
        }
        body.push_str(&paragraph("Приложение 1"));
        body.push_str(&paragraph("{{ appendix_1_summary }}"));
        body.push_str(&paragraph("{{ appendix_1_entries }}"));
        body
    }

    fn setup() -> (tempfile::TempDir, ReportGenerator, AppraisalSession, AppraisalForm) {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.docx");
        DocxPackage::from_body_xml(&template_body()).save(&template_path).unwrap();

        let config = GeneratorConfig {
            template_path,
            output_dir: dir.path().join("generated"),
            ..GeneratorConfig::default()
        };
        let mut session = AppraisalSession::new();
        session.sign_in("Анна", "anna").unwrap();
        let mut form = AppraisalForm::dated(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        form.contract_no = "15/06".into();
        form.basis = "Договор 15/06".into();
        (dir, ReportGenerator::new(config), session, form)
    }

    fn document_xml(report: &GeneratedReport) -> String {
        DocxPackage::from_bytes(&report.bytes)
            .unwrap()
            .part_str(DOCUMENT_PART)
            .unwrap()
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(report_file_name("15/06", "0000042"), "Отчёт_15_06_0000042.docx");
        assert_eq!(report_file_name("  ", "1234567"), "Отчёт_без_номера_1234567.docx");
    }

    #[test]
    fn test_zero_uploads_zero_analogs() {
        let (_dir, generator, session, form) = setup();
        let report = generator
            .generate::<RawUpload>(&session, &form, &FormUploads::default())
            .unwrap();

        let xml = document_xml(&report);
        assert!(xml.contains("Фотографии объекта оценки не загружены"));
        assert!(xml.contains("по договору Договор 15/06"));
        assert!(!xml.contains("{{"));
        assert!(!xml.contains("Объект-аналог"));
        assert!(!xml.contains("<w:drawing>"));
        assert!(report.warnings.is_empty());
        assert_eq!(report.removed_page_blocks, 0);
        assert!(report.path.is_file());
        let user_id = &session.profile.as_ref().unwrap().user_id;
        assert_eq!(report.file_name, format!("Отчёт_15_06_{}.docx", user_id));
    }

    #[test]
    fn test_unused_analog_pages_removed() {
        let (_dir, generator, mut session, form) = setup();
        let first = session.analogs.add().unwrap();
        session.analogs.add().unwrap();
        session.analogs.set_source(first, "auto.ru");
        session
            .analogs
            .set_uploads(first, vec![RawUpload::new("analog.png", png(6, 4))]);

        let report = generator
            .generate::<RawUpload>(&session, &form, &FormUploads::default())
            .unwrap();
        let xml = document_xml(&report);

        assert_eq!(report.removed_page_blocks, 1);
        assert!(xml.contains("Объект-аналог № 1"));
        assert!(xml.contains("Объект-аналог № 2"));
        assert!(xml.contains("Источник информации: (auto.ru)"));
        assert_eq!(xml.matches(r#"w:type="page""#).count(), 2);
        assert_eq!(xml.matches("<w:drawing>").count(), 1);
        assert!(xml.contains("Приложение 1"));
        assert_eq!(report.record.analogs.len(), 2);
    }

    #[test]
    fn test_custom_titles_keep_section_boundaries() {
        for titles in [
            ["Kia Rio", "BMW X5", "Lada Vesta"],
            ["", "", "BMW X5"],
            ["Kia Rio", "", ""],
        ] {
            let (_dir, generator, mut session, form) = setup();
            for title in titles {
                let id = session.analogs.add().unwrap();
                session.analogs.set_title(id, title);
            }

            let report = generator
                .generate::<RawUpload>(&session, &form, &FormUploads::default())
                .unwrap();
            let xml = document_xml(&report);

            assert_eq!(report.removed_page_blocks, 1, "titles {:?}", titles);
            assert_eq!(xml.matches(r#"w:type="page""#).count(), 3, "titles {:?}", titles);
            for n in 1..=3 {
                assert!(xml.contains(&format!("Объект-аналог № {}", n)));
            }
            assert!(!xml.contains("Объект-аналог № 4"));
            assert_eq!(report.record.analogs.len(), 3);
        }
    }

    #[test]
    fn test_failures_become_warnings() {
        let (_dir, generator, session, form) = setup();
        let uploads = FormUploads {
            object_photos: vec![RawUpload::new("car.png", png(8, 6)), RawUpload::new("empty.jpg", vec![])],
            appendix_1: vec![
                RawUpload::new("scan.jpg", b"garbage".to_vec()),
                RawUpload::new("act.pdf", vec![1, 2]),
                RawUpload::new("page.png", png(10, 14)),
            ],
            ..FormUploads::default()
        };

        let report = generator.generate(&session, &form, &uploads).unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[0], "Фото объекта: empty.jpg");
        assert!(report.warnings[1].starts_with("Приложение 1: scan.jpg: "));

        let xml = document_xml(&report);
        assert_eq!(xml.matches("<w:drawing>").count(), 2);
        assert!(xml.contains("1. scan.jpg"));
        assert!(xml.contains("2. act.pdf"));
        assert_eq!(report.record.appendix_1, vec!["scan.jpg", "act.pdf", "page.png"]);
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let (dir, _, session, form) = setup();
        let generator = ReportGenerator::new(GeneratorConfig {
            template_path: dir.path().join("absent.docx"),
            output_dir: dir.path().join("out"),
            ..GeneratorConfig::default()
        });

        let err = generator
            .generate::<RawUpload>(&session, &form, &FormUploads::default())
            .unwrap_err();
        assert!(matches!(err, AppraisalError::Template(DocxError::TemplateNotFound(_))));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_requires_sign_in() {
        let (_dir, generator, _, form) = setup();
        let err = generator
            .generate::<RawUpload>(&AppraisalSession::new(), &form, &FormUploads::default())
            .unwrap_err();
        assert!(matches!(err, AppraisalError::NotSignedIn));
    }
}
