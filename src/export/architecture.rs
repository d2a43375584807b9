//! Architecture exports: guide, structure reference, style sheet and script
//! reference, written as four files sharing one base name.

use chrono::NaiveDateTime;

use crate::analyze::{ArchitectureData, RunContext};
use crate::document::Document;

use super::markup::{escape_html, simplified_markup};
use super::{generated_on, ExportDocument};

const DIVIDER: &str = "/* ========================================= */\n";

pub fn architecture_documents(
    doc: &Document,
    context: &RunContext,
    timestamp: NaiveDateTime,
) -> Vec<ExportDocument> {
    let base = format!("site-architecture_{}", timestamp.format("%Y-%m-%d_%H_%M"));
    let target = context.request.root.label(doc);
    let data = context.architecture.as_ref();
    let max = context.settings.max_export_size;

    vec![
        ExportDocument::new(
            format!("{}_analysis-guide.md", base),
            analysis_guide(doc, context, &target, timestamp),
            max,
        ),
        ExportDocument::new(
            format!("{}_html-structure.html", base),
            html_structure(doc, context, &target, timestamp),
            max,
        ),
        ExportDocument::new(
            format!("{}_complete-styles.css", base),
            complete_styles(data, &target, timestamp),
            max,
        ),
        ExportDocument::new(
            format!("{}_javascript-analysis.md", base),
            javascript_analysis(data, &target, timestamp),
            max,
        ),
    ]
}

fn analysis_guide(
    doc: &Document,
    context: &RunContext,
    target: &str,
    timestamp: NaiveDateTime,
) -> String {
    let mut guide = String::from("# Site Architecture Analysis Guide\n\n");
    guide.push_str(&format!("Generated on: {}\n\n", generated_on(timestamp)));

    guide.push_str("## Analysis Target\n\n");
    guide.push_str(&format!("**Element Selector:** `{}`\n", target));
    guide.push_str(&format!("**Elements Referenced:** {}\n", context.len()));
    guide.push_str("**Mode:** Architecture Analysis (Complete Site Extraction)\n\n");

    guide.push_str("## Architecture Statistics\n\n");
    if let Some(data) = &context.architecture {
        guide.push_str("### CSS Resources\n");
        guide.push_str(&format!("- External Stylesheets: {}\n", data.css.external.len()));
        guide.push_str(&format!("- Inline Style Blocks: {}\n", data.css.inline.len()));
        guide.push_str(&format!("- Total CSS Rules: {}\n\n", data.css.total_rules()));

        guide.push_str("### JavaScript Resources\n");
        guide.push_str(&format!("- External Scripts: {}\n", data.js.external.len()));
        guide.push_str(&format!("- Inline Scripts: {}\n", data.js.inline.len()));
        guide.push_str(&format!(
            "- Total Inline Code: {} characters\n\n",
            data.js.total_inline_size()
        ));
    }

    guide.push_str("## File Structure\n\n");
    guide.push_str("This architecture analysis exports 4 files:\n\n");
    guide.push_str("1. **analysis-guide.md** - This file with instructions\n");
    guide.push_str("2. **html-structure.html** - Target element HTML structure\n");
    guide.push_str("3. **complete-styles.css** - All CSS from the page\n");
    guide.push_str("4. **javascript-analysis.md** - JavaScript references and inline code\n\n");

    guide.push_str("## How to Use This Analysis\n\n");
    guide.push_str("### Step 1: Study the HTML Structure\n");
    guide.push_str(
        "Open `html-structure.html` to understand the component hierarchy and element relationships.\n\n",
    );
    guide.push_str("### Step 2: Review Complete Styles\n");
    guide.push_str("The `complete-styles.css` file contains every readable CSS rule of the page. Search it for selectors of the target element, design tokens and custom properties.\n\n");
    guide.push_str("### Step 3: Analyze JavaScript Behavior\n");
    guide.push_str("Review `javascript-analysis.md` for external script dependencies and inline code.\n\n");
    guide.push_str("### Step 4: Correlation Strategy\n");
    guide.push_str("Use the HTML structure as the map and search the CSS file for its class names, ID selectors, custom properties and framework-specific patterns.\n\n");

    guide.push_str("## Search Patterns\n\n");
    let classes = doc.element(context.root).classes();
    if !classes.is_empty() {
        guide.push_str("### Target Element Classes\n");
        for class in classes.iter().take(10) {
            guide.push_str(&format!("- Search for: `.{}`\n", class));
        }
        guide.push('\n');
    }
    guide.push_str("### General Patterns\n");
    guide.push_str("- `:root` - CSS custom properties/design tokens\n");
    guide.push_str("- `@media` - Responsive breakpoints\n");
    guide.push_str("- Framework prefixes (e.g., `.lg:`, `.md:`, `.v-`, `.ng-`)\n");
    guide.push_str("- Animation/transition rules\n\n");

    guide.push_str("---\n\n");
    guide.push_str(&format!(
        "**Generated by {} {}** - Architecture Analysis Mode\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    guide
}

fn html_structure(
    doc: &Document,
    context: &RunContext,
    target: &str,
    timestamp: NaiveDateTime,
) -> String {
    let markup = simplified_markup(doc, context.root, &context.settings);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>HTML Structure Reference - {target}</title>
    <style>
        body {{ font-family: Arial, sans-serif; padding: 20px; }}
        .analysis-info {{ background: #f5f5f5; padding: 15px; margin-bottom: 20px; border-radius: 5px; }}
        .html-container {{ background: #f9f9f9; padding: 15px; border-radius: 5px; overflow-x: auto; }}
        pre {{ margin: 0; white-space: pre-wrap; }}
    </style>
</head>
<body>
    <div class="analysis-info">
        <h1>HTML Structure Reference</h1>
        <p><strong>Target Selector:</strong> <code>{target}</code></p>
        <p><strong>Generated:</strong> {generated}</p>
        <p><strong>Purpose:</strong> Use this HTML structure as a reference map when searching the complete CSS file for relevant styles.</p>
    </div>

    <div class="html-container">
        <pre><code>{markup}</code></pre>
    </div>
</body>
</html>"#,
        target = escape_html(target),
        generated = generated_on(timestamp),
        markup = escape_html(&markup),
    )
}

fn complete_styles(data: Option<&ArchitectureData>, target: &str, timestamp: NaiveDateTime) -> String {
    let Some(data) = data else {
        return "/* No CSS data available. Please run Architecture Analysis first. */".to_string();
    };
    let mut css = format!(
        "/* Complete Site CSS - Generated by {} */\n",
        env!("CARGO_PKG_NAME")
    );
    css.push_str(&format!("/* Generated on: {} */\n", generated_on(timestamp)));
    css.push_str(&format!("/* Target Element: {} */\n\n", target));

    if !data.css.external.is_empty() {
        css.push_str(DIVIDER);
        css.push_str("/* EXTERNAL STYLESHEETS */\n");
        css.push_str(DIVIDER);
        css.push('\n');
        for (index, sheet) in data.css.external.iter().enumerate() {
            css.push_str(&format!("/* External Stylesheet #{} */\n", index + 1));
            css.push_str(&format!("/* Source: {} */\n", sheet.href));
            if sheet.blocked {
                css.push_str("/* CORS BLOCKED - Content not accessible */\n");
                css.push_str(&format!("/* To access: Download manually from {} */\n\n", sheet.href));
            } else {
                css.push_str(&format!("/* Rules: {} */\n\n", sheet.rule_count));
                css.push_str(&sheet.rules);
                css.push_str("\n\n");
            }
        }
    }

    if !data.css.inline.is_empty() {
        css.push_str(DIVIDER);
        css.push_str("/* INLINE STYLES */\n");
        css.push_str(DIVIDER);
        css.push('\n');
        for block in &data.css.inline {
            css.push_str(&format!("/* {} */\n", block.source));
            css.push_str(&format!("/* Rules: {} */\n\n", block.rule_count));
            css.push_str(&block.rules);
            css.push_str("\n\n");
        }
    }

    css.push_str("/* End of CSS extraction */\n");
    css
}

fn javascript_analysis(
    data: Option<&ArchitectureData>,
    target: &str,
    timestamp: NaiveDateTime,
) -> String {
    let mut js = String::from("# JavaScript Analysis Report\n\n");
    js.push_str(&format!("Generated on: {}\n", generated_on(timestamp)));
    js.push_str(&format!("Target Element: `{}`\n\n", target));

    let Some(data) = data else {
        js.push_str("No JavaScript data available. Please run Architecture Analysis first.\n");
        return js;
    };

    if !data.js.external.is_empty() {
        js.push_str("## External JavaScript Files\n\n");
        js.push_str("The following external scripts are loaded on this page:\n\n");
        for (index, script) in data.js.external.iter().enumerate() {
            js.push_str(&format!("### {}. {}\n\n", index + 1, script.src));
            js.push_str(&format!("- **Type:** {}\n", script.script_type));
            js.push_str(&format!("- **Async:** {}\n", yes_no(script.is_async)));
            js.push_str(&format!("- **Defer:** {}\n", yes_no(script.defer)));
            js.push_str("- **Access:** not read (external file)\n\n");
            js.push_str("**To analyze:** Download manually from the URL above.\n\n");
        }
    }

    if !data.js.inline.is_empty() {
        js.push_str("## Inline JavaScript Code\n\n");
        js.push_str("The following scripts are embedded directly in the page:\n\n");
        for script in &data.js.inline {
            js.push_str(&format!("### {}\n\n", script.source));
            js.push_str(&format!("- **Type:** {}\n", script.script_type));
            js.push_str(&format!("- **Size:** {} characters\n\n", script.size));
            js.push_str(&format!("```javascript\n{}\n```\n\n", script.content));
        }
    }

    if data.js.external.is_empty() && data.js.inline.is_empty() {
        js.push_str("## No JavaScript Found\n\n");
        js.push_str("No external scripts or inline JavaScript code was detected on this page.\n");
    }

    js.push_str("---\n\n");
    js.push_str("**Note:** This analysis captures JavaScript at the time of extraction. Dynamic scripts loaded later may not be included.\n");
    js
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}
