//! HTML report: inline SVG figures with clickable legends

use crate::render::overlay::LegendKind;
use crate::render::Figure;
use crate::report::svg::{escape, figure_svg};
use crate::report::{rows, Summary};
use crate::trial::Trial;
use std::io::{self, Write};

/// Where legend clicks are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Self-contained file; toggles run in the page
    Static,
    /// Served by `rssiview serve`; toggles go through `/api/toggle`
    Served,
}

pub fn write<W: Write>(writer: &mut W, figures: &[Figure], trials: &[Trial]) -> io::Result<()> {
    write_page(writer, figures, trials, Mode::Static)
}

pub fn write_page<W: Write>(writer: &mut W, figures: &[Figure], trials: &[Trial], mode: Mode) -> io::Result<()> {
    let summary = Summary::from_trials(trials);

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>rssiview - trial overlays</title>
    <style>
        :root {{
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --accent: #58a6ff;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1700px; margin: 0 auto; padding: 2rem; }}

        /* Header */
        .header {{
            display: flex;
            align-items: baseline;
            gap: 1rem;
            margin-bottom: 2rem;
            padding-bottom: 1rem;
            border-bottom: 1px solid var(--border);
        }}
        .logo {{ font-size: 2.2rem; font-weight: 800; color: var(--accent); }}
        .subtitle {{ color: var(--dim); }}

        /* Stats Row */
        .stats {{
            display: grid;
            grid-template-columns: repeat(4, 1fr);
            gap: 1rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.25rem;
            text-align: center;
        }}
        .stat-value {{ font-size: 2.5rem; font-weight: 700; line-height: 1; }}
        .stat-label {{ color: var(--dim); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }}

        /* Figures */
        .figure-card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            margin-bottom: 2rem;
            overflow-x: auto;
        }}
        .figure-title {{ font-size: 1.1rem; font-weight: 600; margin-bottom: 0.75rem; }}
        .figure-card svg {{ background: #fff; border-radius: 8px; display: block; }}
        .legend {{ display: flex; flex-wrap: wrap; gap: 0.5rem; margin-bottom: 1rem; }}
        .legend-entry {{
            display: inline-flex;
            align-items: center;
            gap: 0.5rem;
            background: rgba(255,255,255,0.04);
            border: 1px solid var(--border);
            border-radius: 6px;
            color: var(--text);
            font-size: 0.8rem;
            padding: 0.3rem 0.6rem;
            cursor: pointer;
            transition: opacity 0.15s;
        }}
        .legend-entry:hover {{ border-color: var(--accent); }}
        .swatch-dot {{ width: 10px; height: 10px; border-radius: 50%; border: 2px solid; }}
        .swatch-line {{ width: 22px; height: 0; border-top: 2px dashed; }}

        /* Table */
        .table-container {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            overflow: hidden;
        }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 0.6rem 1rem; text-align: left; border-bottom: 1px solid var(--border); }}
        th {{
            background: rgba(255,255,255,0.03);
            font-size: 0.75rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
            color: var(--dim);
        }}
        tr:last-child td {{ border-bottom: none; }}
        .mono {{ font-family: 'SF Mono', 'Fira Code', monospace; font-size: 0.85rem; }}
        .dim {{ color: var(--dim); }}
        .footer {{ color: var(--dim); font-size: 0.8rem; margin-top: 2rem; text-align: center; }}
    </style>
</head>
<body>
<div class="container">
    <div class="header">
        <div class="logo">rssiview</div>
        <div class="subtitle">{figure_count} figure(s) from {total} trial(s)</div>
    </div>

    <div class="stats">
        <div class="stat"><div class="stat-value">{walk}</div><div class="stat-label">Walk</div></div>
        <div class="stat"><div class="stat-value">{jog}</div><div class="stat-label">Jog</div></div>
        <div class="stat"><div class="stat-value">{run}</div><div class="stat-label">Run</div></div>
        <div class="stat"><div class="stat-value">{close} / {far}</div><div class="stat-label">Close / Far</div></div>
    </div>
"#,
        figure_count = figures.len(),
        total = summary.total,
        walk = summary.walk,
        jog = summary.jog,
        run = summary.run,
        close = summary.close,
        far = summary.far,
    )?;

    for (i, figure) in figures.iter().enumerate() {
        write_figure(writer, figure, i)?;
    }

    write_table(writer, trials)?;

    write!(writer, r#"
    <div class="footer">Click a legend entry to show or hide that overlay on every panel of its figure.</div>
</div>
<script>
    const SERVED = {served};

    function elementsOf(fig, label) {{
        return Array.from(document.querySelectorAll('#figure-' + fig + ' g.el'))
            .filter(el => el.dataset.label === label);
    }}

    function apply(fig, label, visible) {{
        elementsOf(fig, label).forEach(el => {{ el.style.display = visible ? '' : 'none'; }});
        document.querySelectorAll('#figure-' + fig + ' .legend-entry').forEach(entry => {{
            if (entry.dataset.label === label) entry.style.opacity = visible ? 1 : {dimmed};
        }});
    }}

    // Any element visible: hide all of them. Otherwise show all.
    function toggle(fig, label) {{
        const els = elementsOf(fig, label);
        if (els.length === 0) return;
        const makeVisible = !els.some(el => el.style.display !== 'none');
        apply(fig, label, makeVisible);
    }}

    function toggleRemote(fig, label) {{
        const query = 'figure=' + fig + '&label=' + encodeURIComponent(label);
        fetch('/api/toggle?' + query, {{ method: 'POST' }})
            .then(r => r.json())
            .then(res => {{ if (res.ok) apply(fig, label, res.data.visible); }})
            .catch(err => console.error('toggle failed', err));
    }}

    document.querySelectorAll('.legend-entry').forEach(entry => {{
        entry.addEventListener('click', () => {{
            const fig = entry.dataset.figure;
            const label = entry.dataset.label;
            if (SERVED) toggleRemote(fig, label); else toggle(fig, label);
        }});
    }});
</script>
</body>
</html>
"#,
        served = mode == Mode::Served,
        dimmed = crate::render::overlay::DIMMED_ALPHA,
    )?;

    Ok(())
}

fn write_figure<W: Write>(writer: &mut W, figure: &Figure, index: usize) -> io::Result<()> {
    writeln!(writer, r#"    <div class="figure-card" id="figure-{}">"#, index)?;
    writeln!(writer, r#"        <div class="figure-title">{}</div>"#, escape(&figure.title))?;
    writeln!(writer, r#"        <div class="legend">"#)?;
    for entry in &figure.legend().entries {
        let swatch = match entry.kind {
            LegendKind::Measured => format!(r#"<span class="swatch-dot" style="border-color:{}"></span>"#, escape(&entry.color)),
            LegendKind::Algorithm => format!(r#"<span class="swatch-line" style="border-color:{}"></span>"#, escape(&entry.color)),
        };
        writeln!(
            writer,
            r#"            <button class="legend-entry" data-figure="{}" data-label="{}" style="opacity:{}">{}{}</button>"#,
            index,
            escape(&entry.label),
            entry.alpha(),
            swatch,
            escape(&entry.label)
        )?;
    }
    writeln!(writer, "        </div>")?;
    writeln!(writer, "        {}", figure_svg(figure, index))?;
    writeln!(writer, "    </div>")
}

fn write_table<W: Write>(writer: &mut W, trials: &[Trial]) -> io::Result<()> {
    writeln!(writer, r#"    <div class="table-container"><table>"#)?;
    writeln!(
        writer,
        "        <thead><tr><th>Sample file</th><th>Id</th><th>Rows</th><th>Peak RSSI</th><th>Speed</th><th>Proximity</th></tr></thead>"
    )?;
    writeln!(writer, "        <tbody>")?;
    for row in rows(trials) {
        writeln!(
            writer,
            r#"        <tr><td class="mono">{}</td><td class="mono">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            escape(&row.name),
            row.id.as_deref().unwrap_or("???"),
            row.rows,
            row.peak_rssi.map(|p| format!("{:.0} dBm", p)).unwrap_or_else(|| "-".to_string()),
            row.speed,
            row.proximity
        )?;
    }
    writeln!(writer, "        </tbody>")?;
    writeln!(writer, "    </table></div>")
}
