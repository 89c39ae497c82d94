//! Interactive HTML page

use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::{parse_markdown, MdBlock, RenderError, Renderer};
use crate::document::{
    array_at, content_md, interactive_config, meta_date, meta_title, meta_watermark, str_field, VisualKind,
};
use crate::exports::ExportKind;

pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn kind(&self) -> ExportKind { ExportKind::Html }

    fn file_name(&self, _doc: &Value) -> String {
        "course_interactive.html".to_string()
    }

    fn render(&self, doc: &Value, out: &Path) -> Result<(), RenderError> {
        fs::write(out, build_html(doc)?)?;
        Ok(())
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Everything is escaped; only structure is produced.
pub fn markdown_to_html(md: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_list = false;
    for block in parse_markdown(md) {
        let is_bullet = matches!(block, MdBlock::Bullet(_));
        if in_list && !is_bullet {
            out.push("</ul>".to_string());
            in_list = false;
        }
        match block {
            MdBlock::Bullet(item) => {
                if !in_list {
                    out.push("<ul>".to_string());
                    in_list = true;
                }
                out.push(format!("<li>{}</li>", escape_html(&item)));
            }
            MdBlock::Code(lines) => {
                out.push(format!("<pre class='code'><code>{}</code></pre>", escape_html(&lines.join("\n"))));
            }
            MdBlock::Blank => out.push("<div class='p-spacer'></div>".to_string()),
            MdBlock::Paragraph(line) => out.push(format!("<p>{}</p>", escape_html(&line))),
        }
    }
    if in_list {
        out.push("</ul>".to_string());
    }
    out.join("\n")
}

fn visual_card(title: &str, caption: &str, body: &str) -> String {
    format!(
        "<div class=\"viz-card\">\n<div class=\"viz-title\">{}</div>\n<div class=\"viz-caption\">{}</div>\n<div class=\"viz-body\">{}</div>\n</div>",
        escape_html(title),
        escape_html(caption),
        body
    )
}

fn render_visual(visual: &Value, idx: usize) -> Result<String, RenderError> {
    let title = str_field(visual, "title");
    let caption = str_field(visual, "caption");
    let data = visual.get("data").cloned().unwrap_or(Value::Object(Default::default()));

    let body = match VisualKind::of(visual) {
        VisualKind::Mermaid => {
            let src = escape_html(str_field(&data, "mermaid"));
            format!(
                "<div class=\"mermaid\">{src}</div><details class=\"viz-src\"><summary>查看 Mermaid 源码</summary><pre>{src}</pre></details>"
            )
        }
        VisualKind::Plot => format!(
            "<canvas class=\"plot-canvas\" id=\"plot_{}\" data-plot=\"{}\"></canvas><details class=\"viz-src\"><summary>查看 Plot 数据</summary><pre>{}</pre></details>",
            idx,
            escape_html(&serde_json::to_string(&data)?),
            escape_html(&serde_json::to_string_pretty(&data)?)
        ),
        VisualKind::Cards => {
            let mut cards = String::new();
            for (i, card) in array_at(&data, "cards").iter().enumerate() {
                let _ = write!(
                    cards,
                    "<div class=\"flip-card\" onclick=\"this.classList.toggle('flipped')\"><div class=\"flip-inner\"><div class=\"flip-front\"><div class=\"flip-label\">Q{n}</div><div class=\"flip-text\">{}</div></div><div class=\"flip-back\"><div class=\"flip-label\">A{n}</div><div class=\"flip-text\">{}</div></div></div></div>",
                    escape_html(str_field(card, "front")),
                    escape_html(str_field(card, "back")),
                    n = i + 1
                );
            }
            format!("<div class=\"flip-grid\">{}</div>", cards)
        }
        VisualKind::Unknown => format!(
            "<div class=\"warn\">未支持的可视化类型：<b>{}</b>（已降级展示）</div><details class=\"viz-src\"><summary>查看原始数据</summary><pre>{}</pre></details>",
            escape_html(&str_field(visual, "type").to_lowercase()),
            escape_html(&serde_json::to_string_pretty(visual)?)
        ),
    };

    let title = if title.is_empty() && VisualKind::of(visual) == VisualKind::Unknown {
        "(untitled)"
    } else {
        title
    };
    Ok(visual_card(title, caption, &body))
}

/// Slider id suffix, coefficient, label.
const SLIDERS: [(&str, &str, &str); 3] = [
    ("A", "a", "二次项系数 a："),
    ("B", "b", "一次项系数 b："),
    ("C", "c", "常数项 c："),
];

fn param(cfg: &Value, name: &str, field: &str) -> f64 {
    cfg["params"][name][field].as_f64().unwrap_or_default()
}

/// Parabola canvas and coefficient sliders, or nothing when the document
/// has no complete `interactive.params`.
fn render_interactive(doc: &Value) -> Result<String, RenderError> {
    let Some(cfg) = interactive_config(doc) else {
        return Ok(String::new());
    };
    let mut controls = String::new();
    for (id, name, label) in SLIDERS {
        let value = param(&cfg, name, "default");
        let _ = write!(
            controls,
            "<div class=\"ctrl\"><div class=\"ctrl-row\"><div class=\"ctrl-label\">{label}</div><div class=\"ctrl-val\" id=\"val{id}\">{value:.2}</div></div>\
<input type=\"range\" id=\"slider{id}\" min=\"{}\" max=\"{}\" step=\"{}\" value=\"{value}\"></div>\n",
            param(&cfg, name, "min"),
            param(&cfg, name, "max"),
            param(&cfg, name, "step"),
        );
    }
    Ok(format!(
        "<div class=\"card\">
<h2 class=\"card-title\">交互可视化： y = ax² + bx + c</h2>
<canvas id=\"parabolaCanvas\" width=\"860\" height=\"420\" data-interactive=\"{}\"></canvas>
<div class=\"controls\">
{controls}<div class=\"hint\">拖动滑块调整系数，观察抛物线的开口方向、顶点位置与整体平移变化。</div>
</div>
</div>
<script>{PARABOLA_SCRIPT}</script>
",
        escape_html(&serde_json::to_string(&cfg)?)
    ))
}

const PARABOLA_SCRIPT: &str = "(function(){\
const cv=document.getElementById('parabolaCanvas');if(!cv)return;\
const cfg=JSON.parse(cv.getAttribute('data-interactive')||'{}');\
const s={a:document.getElementById('sliderA'),b:document.getElementById('sliderB'),c:document.getElementById('sliderC')};\
const ctx=cv.getContext('2d');const W=cv.width,H=cv.height;\
const x0=cfg.domain.x_min,x1=cfg.domain.x_max,y0=cfg.range.y_min,y1=cfg.range.y_max;\
const px=x=>(x-x0)/(x1-x0)*W,py=y=>H-(y-y0)/(y1-y0)*H;\
function draw(){const a=+s.a.value,b=+s.b.value,c=+s.c.value;\
['A','B','C'].forEach(k=>{document.getElementById('val'+k).textContent=(+s[k.toLowerCase()].value).toFixed(2);});\
ctx.clearRect(0,0,W,H);ctx.strokeStyle='#e5e7eb';\
if(cfg.plot_config.grid){for(let x=Math.ceil(x0);x<=x1;x++){ctx.beginPath();ctx.moveTo(px(x),0);ctx.lineTo(px(x),H);ctx.stroke();}\
for(let y=Math.ceil(y0);y<=y1;y++){ctx.beginPath();ctx.moveTo(0,py(y));ctx.lineTo(W,py(y));ctx.stroke();}}\
if(cfg.features.show_axis){ctx.strokeStyle='#64748b';ctx.beginPath();ctx.moveTo(px(0),0);ctx.lineTo(px(0),H);ctx.moveTo(0,py(0));ctx.lineTo(W,py(0));ctx.stroke();}\
ctx.strokeStyle='#2563eb';ctx.lineWidth=2;ctx.beginPath();const n=Math.max(10,cfg.plot_config.samples);\
for(let i=0;i<=n;i++){const x=x0+(x1-x0)*i/n,y=a*x*x+b*x+c;i?ctx.lineTo(px(x),py(y)):ctx.moveTo(px(x),py(y));}\
ctx.stroke();ctx.lineWidth=1;ctx.fillStyle='#dc2626';\
if(cfg.features.show_vertex&&a!==0){const vx=-b/(2*a);ctx.beginPath();ctx.arc(px(vx),py(a*vx*vx+b*vx+c),4,0,7);ctx.fill();}\
if(cfg.features.show_intercepts){const d=b*b-4*a*c;if(a!==0&&d>=0){[(-b+Math.sqrt(d))/(2*a),(-b-Math.sqrt(d))/(2*a)].forEach(r=>{ctx.beginPath();ctx.arc(px(r),py(0),4,0,7);ctx.fill();});}}}\
Object.values(s).forEach(el=>el.addEventListener('input',draw));draw();})();";

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:0 auto;padding:24px;color:#222}\
.watermark{position:fixed;bottom:12px;right:16px;opacity:.25;font-size:28px;pointer-events:none}\
.viz-card{border:1px solid #ddd;border-radius:8px;padding:12px;margin:16px 0}\
.viz-title{font-weight:600}.viz-caption{color:#666;font-size:.9em}\
.flip-grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(200px,1fr));gap:12px}\
.flip-card .flip-back{display:none}.flip-card.flipped .flip-back{display:block}.flip-card.flipped .flip-front{display:none}\
pre.code{background:#f6f8fa;padding:8px;overflow:auto}.p-spacer{height:8px}.warn{color:#b45309}\
.card{border:1px solid #ddd;border-radius:8px;padding:12px;margin:16px 0}#parabolaCanvas{width:100%;height:auto}\
.ctrl-row{display:flex;justify-content:space-between}.ctrl input{width:100%}.hint{color:#666;font-size:.9em}";

pub(crate) fn build_html(doc: &Value) -> Result<String, RenderError> {
    let title = escape_html(&meta_title(doc));
    let date = escape_html(&meta_date(doc));
    let watermark = escape_html(&meta_watermark(doc));

    let mut sections = String::new();
    for (i, section) in array_at(doc, "sections").iter().enumerate() {
        let id = match str_field(section, "id") {
            "" => format!("section-{}", i + 1),
            id => id.to_string(),
        };
        let _ = write!(
            sections,
            "<section id=\"{}\">\n<h2>{}</h2>\n{}\n</section>\n",
            escape_html(&id),
            escape_html(str_field(section, "title")),
            markdown_to_html(content_md(section))
        );
    }

    let mut visuals = String::new();
    for (idx, visual) in array_at(doc, "visuals").iter().enumerate() {
        visuals.push_str(&render_visual(visual, idx)?);
        visuals.push('\n');
    }

    let interactive = render_interactive(doc)?;

    Ok(format!(
        "<!DOCTYPE html>
<html lang=\"zh-CN\">
<head>
<meta charset=\"utf-8\">
<title>{title}</title>
<style>{STYLE}</style>
<script src=\"https://cdn.jsdelivr.net/npm/mermaid/dist/mermaid.min.js\"></script>
</head>
<body>
<header><h1>{title}</h1><div class=\"date\">{date}</div></header>
<main>
{interactive}{sections}<div class=\"visuals\">
{visuals}</div>
</main>
<div class=\"watermark\">{watermark}</div>
</body>
</html>
"
    ))
}
