use psyflow_core::CollectedDataSet;

use crate::debrief::DebriefSummary;

pub const PLEASE_WAIT: &str = "Saving your data, please wait. Do not close this window.";

/// Screens the session shows outside of the trials themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen<'a> {
    PleaseWait,
    SuccessNotice(&'a DebriefSummary),
    DataDump(&'a CollectedDataSet),
    /// `redirect_url` is only echoed in debug mode.
    ExitNotice {
        completion_code: &'a str,
        redirect_url: Option<&'a str>,
    },
    Redirect(&'a str),
}

impl Screen<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::PleaseWait => "please_wait",
            Screen::SuccessNotice(_) => "success_notice",
            Screen::DataDump(_) => "data_dump",
            Screen::ExitNotice { .. } => "exit_notice",
            Screen::Redirect(_) => "redirect",
        }
    }

    /// Plain-text rendition.
    pub fn to_text(&self) -> String {
        match self {
            Screen::PleaseWait => PLEASE_WAIT.to_string(),
            Screen::SuccessNotice(summary) => {
                format!("Data saved successfully.\n{summary}")
            }
            Screen::DataDump(data) => data
                .to_json_pretty()
                .unwrap_or_else(|e| format!("<unprintable data: {e}>")),
            Screen::ExitNotice {
                completion_code,
                redirect_url,
            } => {
                let mut text = format!(
                    "Thank you for taking part!\nYour completion code is {completion_code}.\n\
                     You will be redirected shortly."
                );
                if let Some(url) = redirect_url {
                    text.push_str(&format!("\n[debug] redirect target: {url}"));
                }
                text
            }
            Screen::Redirect(url) => format!("Redirecting to {url}"),
        }
    }
}

/// Where the runner draws its screens.
pub trait SessionView {
    fn render(&mut self, screen: Screen<'_>);
}
