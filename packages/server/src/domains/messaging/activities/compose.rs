//! SMS and push text for outbound messages

use serde_json::Value;

use crate::common::{GeoPoint, Language, LocalizedText, PhoneNumber};
use crate::domains::jobs::{Company, Job};
use crate::domains::messaging::models::{Message, MessageType};
use crate::kernel::PushNotification;

/// App-download deep link for one recipient.
pub fn download_link(base_url: &str, phone: &PhoneNumber) -> String {
    format!(
        "{}?phone={}",
        base_url,
        urlencoding::encode(&phone.full_number())
    )
}

/// `metadata.map.loc` as `[lng, lat]`, if present and well formed.
pub fn map_location(metadata: Option<&Value>) -> Option<GeoPoint> {
    let loc = metadata?.get("map")?.get("loc")?;
    serde_json::from_value::<GeoPoint>(loc.clone()).ok()
}

fn map_link(point: GeoPoint) -> String {
    format!("https://maps.google.com/?q={},{}", point.lat, point.lng)
}

/// Body stored on the Message record for a recruit.
pub fn recruit_message_body(job: &Job, company: &Company) -> LocalizedText {
    let pay = job
        .pay_label()
        .map(|p| format!(" ({})", p))
        .unwrap_or_default();
    LocalizedText::new(
        format!("{} is hiring: {}{}", company.name, job.title, pay),
        format!("{} está contratando: {}{}", company.name, job.title, pay),
    )
}

/// SMS for a recruit message: job, pay and company, then the download link.
pub fn recruit_sms(job: &Job, company: &Company, language: Language, link: &str) -> String {
    let pay = job
        .pay_label()
        .map(|p| format!(", {}", p))
        .unwrap_or_default();
    match language {
        Language::En => format!(
            "{} is hiring: {}{}. Download the app to apply: {}",
            company.name, job.title, pay, link
        ),
        Language::Es => format!(
            "{} está contratando: {}{}. Descarga la aplicación para aplicar: {}",
            company.name, job.title, pay, link
        ),
    }
}

/// SMS for any other message: quoted text, optional map, then the download link.
pub fn message_sms(
    text: &str,
    company: &Company,
    map: Option<GeoPoint>,
    language: Language,
    link: &str,
) -> String {
    let mut body = format!("{}: \"{}\"", company.name, text);
    if let Some(point) = map {
        let label = match language {
            Language::En => "Map",
            Language::Es => "Mapa",
        };
        body.push_str(&format!("\n{}: {}", label, map_link(point)));
    }
    let cta = match language {
        Language::En => "Download the app to reply",
        Language::Es => "Descarga la aplicación para responder",
    };
    body.push_str(&format!("\n{}: {}", cta, link));
    body
}

/// Pick the SMS variant for the message type.
pub fn compose_sms(
    message: &Message,
    job: Option<&Job>,
    company: &Company,
    language: Language,
    link: &str,
) -> String {
    match (&message.message_type, job) {
        (MessageType::Recruit, Some(job)) => recruit_sms(job, company, language, link),
        _ => message_sms(
            message.message.get_or_fallback(language),
            company,
            map_location(message.metadata.as_ref()),
            language,
            link,
        ),
    }
}

pub fn push_notification(message: &Message) -> PushNotification {
    PushNotification {
        contents: message.message.clone(),
        data: serde_json::json!({
            "type": message.message_type.to_string(),
            "message_id": message.id,
            "job_id": message.job_id,
        }),
    }
}
