//! Sample templates and data for demos and tests.
//!
//! Each template uses only what the native engine understands: block and
//! inline tags, `<style>` class rules and inline `style` attributes.

use serde_json::{json, Value};

/// Invoice with a class style sheet and customer placeholders.
pub fn invoice_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
    <title>Invoice {{invoice.number}}</title>
    <style>
        .title { font-size: 24pt; font-weight: bold; color: #1a365d; margin-bottom: 12pt }
        .label { font-weight: bold; margin-top: 6pt }
        .muted { color: #718096; font-size: 9pt }
        .total { font-size: 14pt; font-weight: bold; text-align: right; margin-top: 12pt }
    </style>
</head>
<body>
    <h1 class="title">Invoice {{invoice.number}}</h1>
    <p class="muted">Issued {{invoice.date}}</p>

    <p class="label">From:</p>
    <p>{{seller.name}}</p>
    <p>{{seller.address}}</p>

    <p class="label">To:</p>
    <p>{{customer.name}}</p>
    <p>{{customer.address}}</p>

    <hr>
    <ul>
        <li>Web Development: 40 h at $150.00</li>
        <li>Design Services: 20 h at $125.00</li>
        <li>Hosting (Annual): $500.00</li>
    </ul>
    <hr>

    <p class="total">Total: {{invoice.total}}</p>
    <p class="muted" style="text-align: center">{{{footer}}}</p>
</body>
</html>
"##
}

/// Data record matching [`invoice_template`].
pub fn invoice_data() -> Value {
    json!({
        "invoice": { "number": "2024-001", "date": "2024-03-01", "total": "$9,000.00" },
        "seller": { "name": "Acme Corp", "address": "123 Business St, New York, NY 10001" },
        "customer": { "name": "Client Inc", "address": "456 Client Ave, Los Angeles, CA 90001" },
        "footer": "Thank you for your business."
    })
}

/// Report with headings, inline spans and both list kinds.
pub fn report_template() -> &'static str {
    r##"
<div>
    <h1>{{title}}</h1>
    <p style="color: #718096">{{period}}: <strong>Confidential</strong></p>

    <h2>Executive Summary</h2>
    <p>
        Revenue grew by <span style="color: #2f855a; font-weight: bold">{{growth}}</span>
        year-over-year, reaching a total of <b>{{revenue}}</b> for the quarter.
    </p>

    <h2>Key Highlights</h2>
    <ul>
        <li>Customer acquisition cost reduced by 15%</li>
        <li>Net promoter score improved to 72</li>
        <li>Three new enterprise partnerships signed</li>
    </ul>

    <h2>Action Items</h2>
    <ol>
        <li>Expand sales team</li>
        <li>Launch mobile application beta</li>
        <li>Complete SOC2 Type II certification</li>
    </ol>

    <p style="font-size: 8pt; color: #718096; margin-top: 18pt">
        This document is confidential. Do not distribute without authorization.
    </p>
</div>
"##
}

pub fn report_data() -> Value {
    json!({
        "title": "Quarterly Report",
        "period": "Q4",
        "growth": "23%",
        "revenue": "$4.2M"
    })
}

/// Long enough to need several A4 pages.
pub fn multi_page_template() -> String {
    let mut html = String::from("<h1>Product Specification Document</h1>\n");
    for section in 1..=12 {
        html.push_str(&format!("<h2>{section}. Section {section}</h2>\n"));
        for paragraph in 1..=4 {
            html.push_str(&format!(
                "<p>Paragraph {section}.{paragraph}. The system follows a service \
                 architecture with an API gateway, user, order, notification and \
                 analytics services, each deployed with its own resource budget \
                 and observed through structured logs and metrics.</p>\n"
            ));
        }
        html.push_str("<ul><li>Requirement one</li><li>Requirement two</li></ul>\n<hr>\n");
    }
    html
}

/// Minimal template for unit testing.
pub fn minimal_template() -> &'static str {
    r#"<div><h1>{{title}}</h1><p>{{body}}</p></div>"#
}

/// Template and data by name, for the CLI's `--sample` flag.
pub fn by_name(name: &str) -> Option<(String, Value)> {
    match name {
        "invoice" => Some((invoice_template().to_string(), invoice_data())),
        "report" => Some((report_template().to_string(), report_data())),
        "multipage" => Some((multi_page_template(), json!({}))),
        "minimal" => Some((
            minimal_template().to_string(),
            json!({ "title": "Title", "body": "Body text" }),
        )),
        _ => None,
    }
}

pub const SAMPLE_NAMES: [&str; 4] = ["invoice", "report", "multipage", "minimal"];
