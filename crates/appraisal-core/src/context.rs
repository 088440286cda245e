//! Mapping of collected values onto template placeholder names

use docx_engine::{InlineImage, PhotoGrid, RenderContext, RenderValue, RichText};

use crate::analogs::{analog_heading, AnalogSnapshot, MAX_ANALOGS};
use crate::form::AppraisalForm;
use crate::format::{format_currency, format_date, format_source};
use crate::summary::summarize;
use crate::upload::NormalizedUploads;

/// An attachment group after normalization and image building
#[derive(Debug, Clone, Default)]
pub struct AttachmentGroup {
    pub uploads: NormalizedUploads,
    pub entries: Vec<InlineImage>,
}

/// A live analog slot with its photo grid already built
#[derive(Debug, Clone)]
pub struct AnalogBlock {
    pub snapshot: AnalogSnapshot,
    pub photos: PhotoGrid,
}

#[derive(Debug, Clone)]
pub struct ContextInputs<'a> {
    pub form: &'a AppraisalForm,
    pub object_photos: PhotoGrid,
    pub appendix_1: AttachmentGroup,
    pub appendix_2: AttachmentGroup,
    pub rights: AttachmentGroup,
    /// Live slots in display order; at most [`MAX_ANALOGS`] are used
    pub analogs: Vec<AnalogBlock>,
}

pub fn assemble_context(inputs: ContextInputs<'_>) -> RenderContext {
    let form = inputs.form;
    let mut ctx = RenderContext::new();

    // "Основание" goes into contract_number on purpose
    ctx.insert("contract_number", form.basis.trim());
    ctx.insert("date_ocenka", format_date(form.valuation_date));
    ctx.insert("date_otcheta", format_date(form.report_date));
    ctx.insert("customer_name", form.customer.trim());
    ctx.insert("contractor", form.contractor.trim());
    ctx.insert("otchet_number", form.report_number());
    ctx.insert("object_type", form.object_type.trim());
    ctx.insert("car_name", form.car_name.trim());
    ctx.insert("vin_model", form.vin_model.trim());
    ctx.insert("cost_of_assessment", format_currency(form.price_no_vat));
    ctx.insert("cost_of_assessment_NDS", format_currency(form.price_vat));

    for (prefix, group) in [
        ("appendix_1", inputs.appendix_1),
        ("appendix_2", inputs.appendix_2),
        ("rights", inputs.rights),
    ] {
        ctx.insert(format!("{}_summary", prefix), summarize(&group.uploads));
        ctx.insert(format!("{}_entries", prefix), group.entries);
    }

    ctx.insert("object_ocenki", inputs.object_photos);

    let mut analogs = inputs.analogs.into_iter();
    for n in 1..=MAX_ANALOGS {
        match analogs.next() {
            Some(AnalogBlock { snapshot, photos }) => {
                let source: RenderValue = if !snapshot.files.is_empty() && !snapshot.source.trim().is_empty() {
                    RichText::new(format_source(&snapshot.source)).italic().into()
                } else {
                    RenderValue::Text(String::new())
                };
                ctx.insert(format!("object_analog{}", n), analog_heading(n, &snapshot.title));
                ctx.insert(format!("a_source{}", n), source);
                ctx.insert(format!("object_analog{}_photo", n), photos);
            }
            None => {
                ctx.insert(format!("object_analog{}", n), "");
                ctx.insert(format!("a_source{}", n), "");
                ctx.insert(format!("object_analog{}_photo", n), PhotoGrid::blank());
            }
        }
    }

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::test_support::photo;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn form() -> AppraisalForm {
        let mut form = AppraisalForm::dated(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        form.contract_no = "15/06".into();
        form.basis = "Договор № 15/06 от 01.06.2024".into();
        form.price_vat = 1_440_000.0;
        form.price_no_vat = 1200000.5;
        form
    }

    fn inputs(form: &AppraisalForm, analogs: Vec<AnalogBlock>) -> ContextInputs<'_> {
        ContextInputs {
            form,
            object_photos: PhotoGrid::new(vec![], 2, Some("Фото не загружены".into())),
            appendix_1: AttachmentGroup::default(),
            appendix_2: AttachmentGroup::default(),
            rights: AttachmentGroup::default(),
            analogs,
        }
    }

    fn analog(index: usize, source: &str, with_photo: bool) -> AnalogBlock {
        AnalogBlock {
            snapshot: AnalogSnapshot {
                index,
                slot_id: index as u32,
                title: format!("Аналог {}", index),
                source: source.into(),
                files: if with_photo { vec![photo("a.png")] } else { vec![] },
                failures: vec![],
            },
            photos: PhotoGrid::blank(),
        }
    }

    fn text<'a>(ctx: &'a RenderContext, name: &str) -> &'a str {
        ctx.get(name).and_then(RenderValue::as_text).unwrap()
    }

    #[test]
    fn test_scalar_mapping() {
        let form = form();
        let ctx = assemble_context(inputs(&form, vec![]));

        assert_eq!(text(&ctx, "contract_number"), "Договор № 15/06 от 01.06.2024");
        assert_eq!(text(&ctx, "otchet_number"), "15/06");
        assert_eq!(text(&ctx, "date_ocenka"), "01.06.2024");
        assert_eq!(text(&ctx, "cost_of_assessment"), "1 200 000.50");
        assert_eq!(text(&ctx, "cost_of_assessment_NDS"), "1 440 000.00");
        assert_eq!(text(&ctx, "appendix_1_summary"), "Файлы не загружены");
        assert!(matches!(ctx.get("rights_entries"), Some(RenderValue::Entries(e)) if e.is_empty()));
        assert!(matches!(ctx.get("object_ocenki"), Some(RenderValue::SubDocument(_))));
    }

    #[test]
    fn test_always_ten_analog_triples() {
        let form = form();
        let ctx = assemble_context(inputs(&form, vec![analog(1, "auto.ru", true)]));

        for n in 1..=MAX_ANALOGS {
            assert!(ctx.contains(&format!("object_analog{}", n)));
            assert!(ctx.contains(&format!("a_source{}", n)));
            assert!(ctx.contains(&format!("object_analog{}_photo", n)));
        }
        assert_eq!(text(&ctx, "object_analog1"), "Объект-аналог № 1. Аналог 1");
        assert_eq!(text(&ctx, "object_analog2"), "");
        assert!(matches!(
            ctx.get("object_analog10_photo"),
            Some(RenderValue::SubDocument(grid)) if grid.is_empty() && grid.empty_message().is_none()
        ));
    }

    #[test]
    fn test_source_needs_photo_and_text() {
        let form = form();
        let ctx = assemble_context(inputs(
            &form,
            vec![
                analog(1, "auto.ru", true),
                analog(2, "drom.ru", false),
                analog(3, "   ", true),
            ],
        ));

        match ctx.get("a_source1") {
            Some(RenderValue::RichText(rich)) => {
                assert_eq!(rich.text, "Источник информации: (auto.ru)");
                assert!(rich.italic);
            }
            other => panic!("expected rich text, got {:?}", other),
        }
        assert!(matches!(ctx.get("a_source2"), Some(RenderValue::Text(t)) if t.is_empty()));
        assert!(matches!(ctx.get("a_source3"), Some(RenderValue::Text(t)) if t.is_empty()));
    }
}
