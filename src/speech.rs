//! Text-to-speech for question prompts.

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{SpeechSynthesis, SpeechSynthesisUtterance};

use crate::error::GameError;
use crate::i18n::Locale;

/// BCP-47 voice locale for a UI language.
pub fn speech_locale(lang: Locale) -> &'static str {
    match lang {
        Locale::Ja => "ja-JP",
        Locale::Fr => "fr-FR",
        Locale::Zh => "zh-CN",
        Locale::En => "en-US",
    }
}

pub trait Speaker {
    /// Start speaking `text`, interrupting anything already playing.
    fn speak(&mut self, text: &str, locale: &str) -> Result<(), GameError>;
    fn stop(&mut self);
    fn is_speaking(&self) -> bool;
}

/// Browser speech synthesis.
///
/// The `onstart`/`onend`/`onerror` closures live as long as the utterance
/// they are attached to. `stop` detaches them from the utterance before
/// cancelling, so the events a cancel queues never reach a dropped closure.
pub struct WebSpeaker {
    synth: SpeechSynthesis,
    speaking: Rc<Cell<bool>>,
    current: Option<Utterance>,
}

/// A queued utterance together with the handlers attached to it.
struct Utterance {
    utterance: SpeechSynthesisUtterance,
    _on_start: Closure<dyn FnMut()>,
    _on_end: Closure<dyn FnMut()>,
    _on_error: Closure<dyn FnMut()>,
}

impl Utterance {
    fn detach(&self) {
        self.utterance.set_onstart(None);
        self.utterance.set_onend(None);
        self.utterance.set_onerror(None);
    }
}

fn flag_setter(flag: &Rc<Cell<bool>>, value: bool) -> Closure<dyn FnMut()> {
    let flag = flag.clone();
    Closure::wrap(Box::new(move || flag.set(value)) as Box<dyn FnMut()>)
}

impl WebSpeaker {
    /// `None` when the page has no `speechSynthesis`.
    pub fn new() -> Option<Self> {
        let synth = web_sys::window()?.speech_synthesis().ok()?;
        Some(Self { synth, speaking: Rc::new(Cell::new(false)), current: None })
    }
}

impl Speaker for WebSpeaker {
    fn speak(&mut self, text: &str, locale: &str) -> Result<(), GameError> {
        self.stop();
        let utterance = SpeechSynthesisUtterance::new_with_text(text).map_err(|_| GameError::SpeechUnavailable)?;
        utterance.set_lang(locale);

        let on_start = flag_setter(&self.speaking, true);
        let on_end = flag_setter(&self.speaking, false);
        let on_error = flag_setter(&self.speaking, false);
        utterance.set_onstart(Some(on_start.as_ref().unchecked_ref()));
        utterance.set_onend(Some(on_end.as_ref().unchecked_ref()));
        utterance.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.speaking.set(true);
        self.synth.speak(&utterance);
        self.current = Some(Utterance { utterance, _on_start: on_start, _on_end: on_end, _on_error: on_error });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(current) = self.current.take() {
            current.detach();
        }
        self.synth.cancel();
        self.speaking.set(false);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.get()
    }
}

impl Drop for WebSpeaker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// In-memory speaker that records what it was asked to say.
#[derive(Debug, Default)]
pub struct RecordingSpeaker {
    pub spoken: Vec<(String, String)>,
    speaking: bool,
}

impl Speaker for RecordingSpeaker {
    fn speak(&mut self, text: &str, locale: &str) -> Result<(), GameError> {
        self.spoken.push((text.to_string(), locale.to_string()));
        self.speaking = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.speaking = false;
    }

    fn is_speaking(&self) -> bool {
        self.speaking
    }
}
