//! Embeddable carousel snippet.
//!
//! Renders a self-contained block of HTML, CSS and script that reproduces
//! the carousel's index navigation (previous, next, jump via dots) for pages
//! that do not run the full player. There is no controller, preloading or
//! error reporting in the output; each slide simply mounts a `<video>` or an
//! `<iframe>`.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vcarousel_models::{
    classify, extract_youtube_id, file_name_from_key, parse_web_url, MediaItem,
    MediaSource,
};

use crate::config::PlayerConfig;

const DEFAULT_CONTAINER_ID: &str = "video-carousel";
const DEFAULT_HEIGHT: u32 = 400;

/// One slide of the snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetItem {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl From<MediaItem> for SnippetItem {
    fn from(item: MediaItem) -> Self {
        Self {
            url: item.url,
            thumbnail: item.thumbnail_url,
            name: item.display_name,
        }
    }
}

/// Presentation options of the snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnippetOptions {
    pub container_id: String,
    /// CSS pixels; fluid width when unset
    pub width: Option<u32>,
    /// CSS pixels of the video stage
    pub height: Option<u32>,
    pub autoplay: bool,
    #[serde(alias = "loop")]
    pub loop_playback: bool,
    pub muted: bool,
    pub show_controls: bool,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        Self {
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            width: None,
            height: None,
            autoplay: false,
            loop_playback: false,
            muted: false,
            show_controls: true,
        }
    }
}

impl From<&PlayerConfig> for SnippetOptions {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            container_id: config.container_id.clone(),
            width: config.width,
            height: config.height,
            autoplay: config.autoplay,
            loop_playback: config.loop_playback,
            muted: config.muted,
            show_controls: config.show_controls,
        }
    }
}

/// Slide data handed to the inline script.
#[derive(Serialize)]
struct Slide {
    kind: &'static str,
    src: String,
    thumbnail: Option<String>,
    name: String,
}

#[derive(Serialize)]
struct ScriptOptions {
    autoplay: bool,
    #[serde(rename = "loop")]
    loop_playback: bool,
    muted: bool,
    controls: bool,
}

/// Renders carousel snippets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnippetEmitter;

impl SnippetEmitter {
    pub fn render(items: &[SnippetItem], options: &SnippetOptions) -> String {
        let id = sanitize_container_id(&options.container_id);
        let width = options
            .width
            .map(|w| format!("{}px", w))
            .unwrap_or_else(|| "100%".to_string());
        let height = options.height.unwrap_or(DEFAULT_HEIGHT);

        let slides: Vec<Slide> = items.iter().filter_map(slide).collect();
        let script_options = ScriptOptions {
            autoplay: options.autoplay,
            loop_playback: options.loop_playback,
            muted: options.muted,
            controls: options.show_controls,
        };

        let mut html = String::with_capacity(4096);
        html.push_str(&format!(
            "<div id=\"{id}\" class=\"vc-carousel\" tabindex=\"0\" style=\"width:{width};max-width:100%\">\n"
        ));
        html.push_str("<style>\n");
        html.push_str(&STYLE.replace("#ROOT", &format!("#{id}")).replace("HEIGHT", &height.to_string()));
        html.push_str("</style>\n");
        html.push_str("<div class=\"vc-stage\"></div>\n");
        html.push_str("<div class=\"vc-bar\">");
        html.push_str("<button class=\"vc-prev\" type=\"button\" aria-label=\"Previous video\">&#8249;</button>");
        html.push_str("<span class=\"vc-title\"></span>");
        html.push_str("<button class=\"vc-next\" type=\"button\" aria-label=\"Next video\">&#8250;</button>");
        html.push_str("</div>\n");
        html.push_str("<div class=\"vc-dots\"></div>\n");
        html.push_str("<script>\n");
        html.push_str(
            &SCRIPT
                .replace("__ROOT_ID__", &script_json(&id))
                .replace("__ITEMS__", &script_json(&slides))
                .replace("__OPTIONS__", &script_json(&script_options)),
        );
        html.push_str("</script>\n");
        html.push_str("</div>\n");
        html
    }
}

fn slide(item: &SnippetItem) -> Option<Slide> {
    let source = classify(&item.url);
    let target = match &source {
        MediaSource::SharePlatform { .. } => extract_youtube_id(&item.url)
            .ok()
            .map(|id| ("iframe", format!("https://www.youtube.com/embed/{}", id))),
        _ if !source.is_playable() => None,
        MediaSource::Native { url } => Some(("native", url.clone())),
        MediaSource::StreamingEmbed { .. } => source.iframe_url().map(|src| ("iframe", src)),
    };

    let Some((kind, src)) = target else {
        debug!(url = %item.url, "Dropping unplayable snippet item");
        return None;
    };

    let name = if item.name.trim().is_empty() {
        file_name_from_key(&item.url).to_string()
    } else {
        item.name.clone()
    };

    Some(Slide {
        kind,
        src,
        thumbnail: item.thumbnail.clone().filter(|t| is_poster_url(t)),
        name,
    })
}

/// Root-relative paths or web URLs; anything else is not used as a poster.
fn is_poster_url(url: &str) -> bool {
    url.starts_with('/') || parse_web_url(url).is_some()
}

/// Keep only characters that are safe in an element id and CSS selector.
fn sanitize_container_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    match cleaned.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => cleaned,
        Some(_) => format!("vc-{}", cleaned),
        None => DEFAULT_CONTAINER_ID.to_string(),
    }
}

/// JSON suitable for inlining in a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

const STYLE: &str = r#"#ROOT{position:relative;font-family:system-ui,sans-serif;outline:none}
#ROOT .vc-stage{position:relative;height:HEIGHTpx;background:#000;overflow:hidden;border-radius:8px}
#ROOT .vc-stage video,#ROOT .vc-stage iframe{width:100%;height:100%;border:0;object-fit:contain}
#ROOT .vc-bar{display:flex;align-items:center;gap:8px;margin-top:8px}
#ROOT .vc-title{flex:1;text-align:center;overflow:hidden;text-overflow:ellipsis;white-space:nowrap}
#ROOT button{cursor:pointer;border:0;background:#222;color:#fff;border-radius:4px;padding:4px 12px;font-size:18px}
#ROOT button:disabled{opacity:.35;cursor:default}
#ROOT .vc-dots{display:flex;justify-content:center;gap:6px;margin-top:8px}
#ROOT .vc-dot{width:10px;height:10px;padding:0;border-radius:50%;background:#bbb}
#ROOT .vc-dot.vc-active{background:#222}
"#;

const SCRIPT: &str = r#"(function () {
  var root = document.getElementById(__ROOT_ID__);
  if (!root) return;
  var items = __ITEMS__;
  var opts = __OPTIONS__;
  var stage = root.querySelector(".vc-stage");
  var title = root.querySelector(".vc-title");
  var prev = root.querySelector(".vc-prev");
  var next = root.querySelector(".vc-next");
  var dots = root.querySelector(".vc-dots");
  var index = 0;

  function withParams(src) {
    var params = [];
    if (opts.autoplay) params.push("autoplay=1");
    if (opts.muted) params.push("mute=1", "muted=1");
    if (opts.loop) params.push("loop=1");
    if (!params.length) return src;
    return src + (src.indexOf("?") === -1 ? "?" : "&") + params.join("&");
  }

  function mount(item) {
    stage.innerHTML = "";
    var el;
    if (item.kind === "native") {
      el = document.createElement("video");
      el.src = item.src;
      el.controls = opts.controls;
      el.autoplay = opts.autoplay;
      el.loop = opts.loop;
      el.muted = opts.muted;
      el.playsInline = true;
      el.preload = "metadata";
      if (item.thumbnail) el.poster = item.thumbnail;
    } else {
      el = document.createElement("iframe");
      el.src = withParams(item.src);
      el.allow = "autoplay; encrypted-media; fullscreen; picture-in-picture";
      el.allowFullscreen = true;
    }
    stage.appendChild(el);
  }

  function show(i) {
    if (i < 0 || i >= items.length) return;
    index = i;
    mount(items[i]);
    title.textContent = items[i].name;
    prev.disabled = i === 0;
    next.disabled = i === items.length - 1;
    var all = dots.children;
    for (var d = 0; d < all.length; d++) {
      all[d].className = d === i ? "vc-dot vc-active" : "vc-dot";
      all[d].setAttribute("aria-current", d === i ? "true" : "false");
    }
  }

  if (!items.length) {
    title.textContent = "No videos";
    prev.disabled = true;
    next.disabled = true;
    return;
  }

  items.forEach(function (item, i) {
    var dot = document.createElement("button");
    dot.type = "button";
    dot.className = "vc-dot";
    dot.setAttribute("aria-label", "Go to video " + (i + 1));
    dot.addEventListener("click", function () { show(i); });
    dots.appendChild(dot);
  });

  prev.addEventListener("click", function () { show(index - 1); });
  next.addEventListener("click", function () { show(index + 1); });
  root.addEventListener("keydown", function (e) {
    if (e.key === "ArrowLeft") show(index - 1);
    else if (e.key === "ArrowRight") show(index + 1);
  });

  show(0);
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, name: &str) -> SnippetItem {
        SnippetItem {
            url: url.to_string(),
            thumbnail: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_names_cannot_break_out_of_script() {
        let html = SnippetEmitter::render(
            &[item("https://cdn.example.com/a.mp4", "</script><script>alert(1)</script>")],
            &SnippetOptions::default(),
        );

        assert_eq!(html.matches("<script>").count(), 1);
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains("\\u003c/script\\u003e"));
    }

    #[test]
    fn test_contains_index_navigation() {
        let html = SnippetEmitter::render(
            &[item("https://cdn.example.com/a.mp4", "A"), item("https://cdn.example.com/b.mp4", "B")],
            &SnippetOptions::default(),
        );

        assert!(html.contains("vc-dot"));
        assert!(html.contains("show(index - 1)"));
        assert!(html.contains("show(index + 1)"));
        assert!(html.contains("document.getElementById(\"video-carousel\")"));
    }

    #[test]
    fn test_sources_are_resolved_per_kind() {
        let html = SnippetEmitter::render(
            &[
                item("https://youtu.be/dQw4w9WgXcQ", ""),
                item("https://vimeo.com/76979871", "Vimeo"),
                item("https://cdn.example.com/videos/clip.mp4", ""),
            ],
            &SnippetOptions::default(),
        );

        assert!(html.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
        assert!(html.contains("https://player.vimeo.com/video/76979871"));
        assert!(html.contains("\"name\":\"clip.mp4\""));
    }

    #[test]
    fn test_container_id_is_sanitized() {
        let options = SnippetOptions {
            container_id: "x\" onload=\"evil()".to_string(),
            width: Some(640),
            ..Default::default()
        };
        let html = SnippetEmitter::render(&[], &options);

        assert!(html.starts_with("<div id=\"xonloadevil\""));
        assert!(html.contains("width:640px"));
        assert!(!html.contains("evil()"));
    }

    #[test]
    fn test_options_from_player_config() {
        let config = PlayerConfig {
            container_id: "promo".to_string(),
            autoplay: true,
            muted: true,
            ..Default::default()
        };
        let options = SnippetOptions::from(&config);
        let html = SnippetEmitter::render(&[item("https://cdn.example.com/a.mp4", "A")], &options);

        assert!(html.contains("\"autoplay\":true"));
        assert!(html.contains("\"muted\":true"));
        assert!(html.contains("#promo .vc-stage"));
    }

    #[test]
    fn test_script_urls_are_not_emitted_as_sources() {
        let html = SnippetEmitter::render(
            &[
                item("javascript:alert(document.domain)//vimeo.com", "x"),
                item("javascript:alert(1)", "y"),
                item("https://cdn.example.com/a.mp4", "A"),
            ],
            &SnippetOptions::default(),
        );

        assert!(!html.contains("\"src\":\"javascript:"));
        assert!(!html.contains("alert("));
        assert_eq!(html.matches("\"kind\":").count(), 1);
    }

    #[test]
    fn test_share_platform_ids_are_validated() {
        let html = SnippetEmitter::render(
            &[
                item("https://youtube.com/watch?v=short", "bad"),
                item("https://www.youtube.com/shorts/dQw4w9WgXcQ", "good"),
            ],
            &SnippetOptions::default(),
        );

        assert!(!html.contains("embed/short\""));
        assert!(html.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
        assert_eq!(html.matches("\"kind\":").count(), 1);
    }

    #[test]
    fn test_script_thumbnails_are_dropped() {
        let mut with_thumb = item("https://cdn.example.com/a.mp4", "A");
        with_thumb.thumbnail = Some("javascript:alert(2)".to_string());
        let html = SnippetEmitter::render(&[with_thumb], &SnippetOptions::default());

        assert!(html.contains("\"thumbnail\":null"));
        assert!(!html.contains("alert(2)"));
    }
}
