//! Audit/preview record of one submission

use serde::{Deserialize, Serialize};

use crate::analogs::AnalogSnapshot;
use crate::form::AppraisalForm;
use crate::format::format_date;
use crate::session::UserProfile;
use crate::upload::NormalizedUploads;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogSummary {
    #[serde(rename = "Номер")]
    pub index: usize,
    #[serde(rename = "Название")]
    pub title: String,
    #[serde(rename = "Источник")]
    pub source: String,
    #[serde(rename = "Фото")]
    pub photos: Vec<String>,
}

impl From<&AnalogSnapshot> for AnalogSummary {
    fn from(snapshot: &AnalogSnapshot) -> Self {
        Self {
            index: snapshot.index,
            title: snapshot.title.clone(),
            source: snapshot.source.clone(),
            photos: snapshot.files.iter().map(|f| f.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalRecord {
    #[serde(rename = "UUID пользователя")]
    pub user_id: String,
    #[serde(rename = "Пользователь")]
    pub user_name: String,
    #[serde(rename = "Логин")]
    pub user_login: String,
    #[serde(rename = "Номер договора")]
    pub contract_no: String,
    #[serde(rename = "Основание")]
    pub basis: String,
    #[serde(rename = "Дата оценки")]
    pub valuation_date: String,
    #[serde(rename = "Дата составления отчета")]
    pub report_date: String,
    #[serde(rename = "Заказчик")]
    pub customer: String,
    #[serde(rename = "Подрядчик")]
    pub contractor: String,
    #[serde(rename = "Стоимость с НДС")]
    pub price_vat: f64,
    #[serde(rename = "Стоимость без НДС")]
    pub price_no_vat: f64,
    #[serde(rename = "Фото объекта")]
    pub object_photos: Vec<String>,
    #[serde(rename = "Приложение 1")]
    pub appendix_1: Vec<String>,
    #[serde(rename = "Приложение 2")]
    pub appendix_2: Vec<String>,
    #[serde(rename = "Правоустанавливающие документы")]
    pub rights_documents: Vec<String>,
    #[serde(rename = "Аналоги")]
    pub analogs: Vec<AnalogSummary>,
}

pub struct RecordSources<'a> {
    pub profile: &'a UserProfile,
    pub form: &'a AppraisalForm,
    pub object_photos: &'a NormalizedUploads,
    pub appendix_1: &'a NormalizedUploads,
    pub appendix_2: &'a NormalizedUploads,
    pub rights_documents: &'a NormalizedUploads,
    pub analogs: &'a [AnalogSnapshot],
}

impl AppraisalRecord {
    pub fn collect(src: RecordSources<'_>) -> Self {
        Self {
            user_id: src.profile.user_id.clone(),
            user_name: src.profile.name.clone(),
            user_login: src.profile.login.clone(),
            contract_no: src.form.contract_no.trim().to_string(),
            basis: src.form.basis.trim().to_string(),
            valuation_date: format_date(src.form.valuation_date),
            report_date: format_date(src.form.report_date),
            customer: src.form.customer.trim().to_string(),
            contractor: src.form.contractor.trim().to_string(),
            price_vat: src.form.price_vat,
            price_no_vat: src.form.price_no_vat,
            object_photos: src.object_photos.names(),
            appendix_1: src.appendix_1.names(),
            appendix_2: src.appendix_2.names(),
            rights_documents: src.rights_documents.names(),
            analogs: src.analogs.iter().map(AnalogSummary::from).collect(),
        }
    }
}
