use tracing::{debug, warn};

use crate::common::{Language, LocalizedText};
use crate::kernel::BaseTranslationService;

/// Fill whichever language is blank from the other one.
///
/// On translation failure the source text is copied over so both languages
/// always carry something. Bodies with both or neither language set are
/// returned unchanged.
pub async fn fill_missing_translation(
    mut body: LocalizedText,
    translator: &dyn BaseTranslationService,
) -> LocalizedText {
    let en_blank = body.en.trim().is_empty();
    let es_blank = body.es.trim().is_empty();

    let (source, target) = match (en_blank, es_blank) {
        (false, true) => (Language::En, Language::Es),
        (true, false) => (Language::Es, Language::En),
        _ => return body,
    };

    let text = body.get(source).to_string();
    match translator.translate(&text, source, target).await {
        Ok(translated) => {
            debug!(source = source.code(), target = target.code(), "translated message body");
            body.set(target, translated);
        }
        Err(e) => {
            warn!(error = %e, target = target.code(), "translation failed, copying source text");
            body.set(target, text);
        }
    }
    body
}
