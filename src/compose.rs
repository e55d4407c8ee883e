use regex::Regex;

use crate::project::FileNode;

/// Shown when the file set has no markup file to build on.
pub const FALLBACK_DOCUMENT: &str = "<html><body><h1 style=\"font-family: sans-serif; color: #333;\">No index.html file found.</h1></body></html>";

/// In-document drag engine, injected into previews and carried along when a
/// composed page is opened in a real browser. Mirrors the native engine:
/// same draggable-element rules, same selector synthesis, same one-pixel
/// report threshold. Completed gestures are posted to the embedding window
/// as `{type: 'element-dragged', selector, transform}`.
pub const DRAG_RUNTIME_JS: &str = r#"(function () {
    'use strict';

    var NOT_DRAGGABLE = 'html, body, script, style, a, button, input, textarea, select';
    var HIGHLIGHT = '2px solid #38bdf8';

    var hovered = null;
    var dragged = null;
    var startX = 0;
    var startY = 0;
    var originX = 0;
    var originY = 0;

    function draggable(el) {
        return el instanceof Element && !el.matches(NOT_DRAGGABLE);
    }

    function selectorFor(el) {
        if (!(el instanceof Element)) {
            return '';
        }
        var path = [];
        while (el && el.nodeType === Node.ELEMENT_NODE) {
            var token = el.nodeName.toLowerCase();
            if (el.id) {
                path.unshift(token + '#' + el.id);
                break;
            }
            var nth = 1;
            var sibling = el;
            while ((sibling = sibling.previousElementSibling)) {
                if (sibling.nodeName === el.nodeName) {
                    nth++;
                }
            }
            if (nth !== 1) {
                token += ':nth-of-type(' + nth + ')';
            }
            path.unshift(token);
            el = el.parentElement;
        }
        return path.join(' ');
    }

    function currentTranslation(el) {
        var value = window.getComputedStyle(el).transform;
        if (!value || value === 'none') {
            return { x: 0, y: 0 };
        }
        var match = value.match(/matrix.*\((.+)\)/);
        if (!match) {
            return { x: 0, y: 0 };
        }
        var parts = match[1].split(', ');
        var base = value.indexOf('3d') !== -1 ? 12 : 4;
        var x = parseFloat(parts[base]);
        var y = parseFloat(parts[base + 1]);
        if (isNaN(x) || isNaN(y)) {
            return { x: 0, y: 0 };
        }
        return { x: x, y: y };
    }

    document.addEventListener('mouseover', function (e) {
        if (dragged || !draggable(e.target)) {
            return;
        }
        if (hovered && hovered !== e.target) {
            hovered.style.outline = '';
            hovered.style.outlineOffset = '';
            hovered.style.cursor = '';
        }
        hovered = e.target;
        hovered.style.outline = HIGHLIGHT;
        hovered.style.outlineOffset = '-2px';
        hovered.style.cursor = 'move';
    });

    document.addEventListener('mouseout', function (e) {
        if (dragged || e.target !== hovered || !hovered) {
            return;
        }
        hovered.style.outline = '';
        hovered.style.outlineOffset = '';
        hovered.style.cursor = '';
        hovered = null;
    });

    document.addEventListener('mousedown', function (e) {
        if (!hovered || e.target !== hovered) {
            return;
        }
        e.preventDefault();
        e.stopPropagation();
        dragged = hovered;
        var origin = currentTranslation(dragged);
        originX = origin.x;
        originY = origin.y;
        startX = e.clientX;
        startY = e.clientY;
        document.addEventListener('mousemove', onMove);
        document.addEventListener('mouseup', onUp, { once: true });
    });

    function onMove(e) {
        if (!dragged) {
            return;
        }
        var dx = e.clientX - startX;
        var dy = e.clientY - startY;
        dragged.style.transform = 'translate(' + (originX + dx) + 'px, ' + (originY + dy) + 'px)';
    }

    function onUp(e) {
        document.removeEventListener('mousemove', onMove);
        if (!dragged) {
            return;
        }
        var dx = e.clientX - startX;
        var dy = e.clientY - startY;
        var netX = originX + dx;
        var netY = originY + dy;
        var selector = selectorFor(dragged);
        var transform = 'translate(' + netX.toFixed(2) + 'px, ' + netY.toFixed(2) + 'px)';
        if (selector && (Math.abs(dx) > 1 || Math.abs(dy) > 1)) {
            window.parent.postMessage({
                type: 'element-dragged',
                selector: selector,
                transform: transform
            }, '*');
        }
        if (netX !== 0 || netY !== 0) {
            dragged.style.transform = transform;
        } else {
            dragged.style.transform = '';
        }
        dragged = null;
    }
})();"#;

/// Builds one self-contained document from a generated file set.
///
/// The first `*.html` file is the base. Every `*.css` file is inlined as a
/// `<style>` block before `</head>` and every `*.js` file as a `<script>`
/// block before `</body>`, with the drag runtime appended last when
/// `inject_script` is set. External stylesheet and script references become
/// dangling once their targets are inlined, so those tags are removed.
///
/// Output depends only on the inputs, which lets callers use the composed
/// string itself as a cache key.
pub fn compose(files: &[FileNode], inject_script: bool) -> String {
    let markup = match files.iter().find(|f| f.name.ends_with(".html")) {
        Some(file) => file.content.clone(),
        None => return FALLBACK_DOCUMENT.to_string(),
    };

    let style_tags = files
        .iter()
        .filter(|f| f.name.ends_with(".css"))
        .map(|f| format!("<style>{}</style>", f.content))
        .collect::<Vec<_>>()
        .join("\n");
    let mut html = markup.replacen("</head>", &format!("{style_tags}</head>"), 1);

    let mut script_tags = files
        .iter()
        .filter(|f| f.name.ends_with(".js"))
        .map(|f| format!("<script>{}</script>", f.content))
        .collect::<Vec<_>>()
        .join("\n");
    if inject_script {
        script_tags.push_str(&format!("<script>{DRAG_RUNTIME_JS}</script>"));
    }
    html = html.replacen("</body>", &format!("{script_tags}</body>"), 1);

    if let Ok(pattern) = Regex::new(r#"<link\s+rel="stylesheet"\s+href=".*?\.css">"#) {
        html = pattern.replace_all(&html, "").into_owned();
    }
    if let Ok(pattern) = Regex::new(r#"<script\s+src=".*?\.js"\s*(defer|async)*></script>"#) {
        html = pattern.replace_all(&html, "").into_owned();
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content: &str) -> FileNode {
        FileNode {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_missing_markup_yields_fallback() {
        assert_eq!(compose(&[], false), FALLBACK_DOCUMENT);
        assert_eq!(compose(&[], true), FALLBACK_DOCUMENT);
        let files = [file("style.css", "body { margin: 0; }")];
        assert_eq!(compose(&files, true), FALLBACK_DOCUMENT);
    }

    #[test]
    fn test_styles_inline_before_head_close() {
        let files = [
            file("index.html", "<html><head><title>t</title></head><body></body></html>"),
            file("style.css", "h1 { color: red; }"),
        ];
        let composed = compose(&files, false);
        assert!(composed.contains("<style>h1 { color: red; }</style></head>"));
    }

    #[test]
    fn test_scripts_inline_before_body_close() {
        let files = [
            file("index.html", "<html><head></head><body><p>x</p></body></html>"),
            file("main.js", "console.log('hi');"),
        ];
        let composed = compose(&files, false);
        assert!(composed.contains("<script>console.log('hi');</script></body>"));
    }

    #[test]
    fn test_external_references_removed() {
        let files = [file(
            "index.html",
            "<html><head><link rel=\"stylesheet\" href=\"style.css\"></head>\
             <body><script src=\"main.js\"></script><script src=\"app.js\" defer></script></body></html>",
        )];
        let composed = compose(&files, false);
        assert!(!composed.contains("<link"));
        assert!(!composed.contains("src="));
    }

    #[test]
    fn test_runtime_injected_only_on_request() {
        let files = [file("index.html", "<html><head></head><body></body></html>")];
        let with_runtime = compose(&files, true);
        let without_runtime = compose(&files, false);
        assert!(with_runtime.contains("element-dragged"));
        assert!(!without_runtime.contains("element-dragged"));
    }

    #[test]
    fn test_first_markup_file_wins() {
        let files = [
            file("a.html", "<html><body><p>first</p></body></html>"),
            file("b.html", "<html><body><p>second</p></body></html>"),
        ];
        let composed = compose(&files, false);
        assert!(composed.contains("first"));
        assert!(!composed.contains("second"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let files = [
            file("index.html", "<html><head></head><body></body></html>"),
            file("a.css", "p { margin: 0; }"),
            file("b.css", "p { padding: 0; }"),
            file("main.js", "let x = 1;"),
        ];
        assert_eq!(compose(&files, true), compose(&files, true));
    }

    #[test]
    fn test_multiple_styles_keep_file_order() {
        let files = [
            file("index.html", "<html><head></head><body></body></html>"),
            file("a.css", "/* first */"),
            file("b.css", "/* second */"),
        ];
        let composed = compose(&files, false);
        let first = composed.find("/* first */").unwrap();
        let second = composed.find("/* second */").unwrap();
        assert!(first < second);
    }
}
