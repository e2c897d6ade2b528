use ammonia::clean_text;
use pdf_chat_core::{ChatHistory, UploadSummary};

pub const QUESTION_MAX_CHARS: usize = 255;

#[derive(Debug, Default)]
pub struct PageView<'a> {
    pub question: Option<&'a str>,
    pub uploaded: Option<UploadSummary>,
    pub chat_history: Option<&'a ChatHistory>,
    pub error: Option<String>,
}

pub fn render_page(view: &PageView<'_>) -> String {
    let mut body = String::new();

    if let Some(error) = &view.error {
        body.push_str(&format!(
            "<p class=\"error\" role=\"alert\">{}</p>\n",
            clean_text(error)
        ));
    }

    if let Some(summary) = view.uploaded {
        body.push_str(&format!(
            "<p class=\"upload-summary\">Indexed {} document(s) into {} chunk(s).</p>\n",
            summary.documents, summary.chunks
        ));
    }

    body.push_str(&render_form(view.question.unwrap_or_default()));

    if let Some(history) = view.chat_history {
        body.push_str(&render_history(history));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Chat with your PDFs</title>\n</head>\n<body>\n<h1>Chat with your PDFs</h1>\n\
         {body}</body>\n</html>\n"
    )
}

fn render_form(question: &str) -> String {
    format!(
        "<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n\
         <label for=\"pdf_files\">PDF files</label>\n\
         <input type=\"file\" id=\"pdf_files\" name=\"pdf_files\" accept=\"application/pdf\" multiple>\n\
         <label for=\"question\">Question</label>\n\
         <input type=\"text\" id=\"question\" name=\"question\" maxlength=\"{QUESTION_MAX_CHARS}\" value=\"{}\">\n\
         <button type=\"submit\">Submit</button>\n\
         </form>\n",
        clean_text(question)
    )
}

fn render_history(history: &ChatHistory) -> String {
    let mut html = String::from("<ol class=\"chat-history\">\n");
    for turn in history.turns() {
        html.push_str(&format!(
            "<li>\n<p class=\"user\">{}</p>\n<p class=\"bot\">{}</p>\n</li>\n",
            clean_text(&turn.question),
            clean_text(&turn.answer)
        ));
    }
    html.push_str("</ol>\n");
    html
}
