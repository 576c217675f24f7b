use crate::calendar::WEEKDAY_LABELS;
use crate::models::{DayCell, MonthResponse};
use crate::summary::format_amount;
pub fn render_index(view: &MonthResponse, live: bool) -> String {
    let summary = &view.summary;
    INDEX_HTML
        .replace("{{MONTH}}", &view.month)
        .replace("{{PREV}}", &view.prev)
        .replace("{{NEXT}}", &view.next)
        .replace("{{WEEKDAYS}}", &render_weekdays())
        .replace("{{GRID}}", &render_grid(view))
        .replace("{{TOTAL}}", &summary.total_days.to_string())
        .replace("{{CLEAN}}", &summary.clean_days.to_string())
        .replace("{{SAVED}}", &format_amount(summary.saved_money))
        .replace("{{GOAL}}", &format_amount(summary.savings_goal))
        .replace("{{PROGRESS}}", &format!("{:.1}", summary.goal_progress * 100.0))
        .replace("{{LIVE}}", if live { "true" } else { "false" })
}

fn render_weekdays() -> String {
    WEEKDAY_LABELS
        .iter()
        .enumerate()
        .map(|(index, label)| {
            format!(r#"<div class="weekday {}">{label}</div>"#, weekend_class(index as u32))
        })
        .collect()
}

fn render_grid(view: &MonthResponse) -> String {
    let mut html = String::new();
    for _ in 0..view.leading_blanks {
        html.push_str(r#"<div class="blank"></div>"#);
    }
    for cell in &view.days {
        render_cell(&mut html, cell, &view.month);
    }
    html
}

fn render_cell(html: &mut String, cell: &DayCell, month: &str) {
    let mut classes = vec!["day"];
    if cell.checked {
        classes.push("checked");
    }
    if cell.today {
        classes.push("today");
    }
    let weekend = weekend_class(cell.weekday);
    if !weekend.is_empty() {
        classes.push(weekend);
    }

    html.push_str(&format!(
        r#"<form method="post" action="/toggle/{date}?month={month}"><button type="submit" class="{classes}" data-date="{date}">{day}</button></form>"#,
        date = cell.date,
        classes = classes.join(" "),
        day = cell.day,
    ));
}

fn weekend_class(weekday: u32) -> &'static str {
    match weekday {
        0 => "sun",
        6 => "sat",
        _ => "",
    }
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Smoke-free Calendar</title>
  <style>
    :root {
      --ink: #1f1f1f;
      --muted: #6f6a65;
      --clean: #4ade80;
      --empty: #e5e7eb;
      --sun: #ef4444;
      --sat: #3b82f6;
      --accent: #db2777;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: white;
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: flex;
      flex-direction: column;
      align-items: center;
      padding: 16px;
    }

    .cheer {
      color: var(--accent);
      font-size: 1.1rem;
      font-weight: 600;
      margin-bottom: 16px;
    }

    .calendar {
      width: 360px;
      max-width: 100%;
    }

    .nav {
      display: flex;
      justify-content: space-between;
      align-items: center;
      margin-bottom: 16px;
    }

    .nav a {
      padding: 4px 10px;
      border: 1px solid #d1d5db;
      border-radius: 6px;
      color: inherit;
      text-decoration: none;
    }

    h1 {
      font-size: 1.25rem;
      margin: 0;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 4px;
      text-align: center;
      font-size: 0.9rem;
    }

    .weekday {
      font-weight: 600;
    }

    .grid form {
      margin: 0;
    }

    .day {
      width: 100%;
      padding: 8px 0;
      border: 1px solid #d1d5db;
      border-radius: 6px;
      background: var(--empty);
      font: inherit;
      cursor: pointer;
    }

    .day.checked {
      background: var(--clean);
    }

    .day.today {
      outline: 2px solid var(--accent);
    }

    .sun {
      color: var(--sun);
    }

    .sat {
      color: var(--sat);
    }

    .summary {
      margin-top: 24px;
      font-size: 1.1rem;
    }

    .summary p {
      margin: 6px 0;
    }

    .progress {
      height: 8px;
      border-radius: 999px;
      background: var(--empty);
      overflow: hidden;
    }

    .progress span {
      display: block;
      height: 100%;
      background: var(--clean);
    }
  </style>
</head>
<body>
  <div class="cheer">One day at a time. You've got this!</div>
  <main class="calendar">
    <div class="nav">
      <a href="/?month={{PREV}}" aria-label="Previous month">&#9664;</a>
      <h1>{{MONTH}} smoke-free calendar</h1>
      <a href="/?month={{NEXT}}" aria-label="Next month">&#9654;</a>
    </div>

    <div class="grid">{{WEEKDAYS}}</div>
    <div class="grid" id="days">{{GRID}}</div>

    <section class="summary">
      <p><strong id="clean">{{CLEAN}}</strong> smoke-free days out of <strong id="total">{{TOTAL}}</strong>!</p>
      <p>Saved <strong id="saved">{{SAVED}}</strong> of <strong>{{GOAL}}</strong> won toward the laptop.</p>
      <div class="progress"><span id="progress" style="width: {{PROGRESS}}%"></span></div>
    </section>
  </main>

  <script>
    const live = {{LIVE}};
    const clean = document.getElementById('clean');
    const total = document.getElementById('total');
    const saved = document.getElementById('saved');
    const progress = document.getElementById('progress');

    const showSummary = (summary) => {
      clean.textContent = summary.clean_days;
      total.textContent = summary.total_days;
      saved.textContent = summary.saved_money.toLocaleString('en-US');
      progress.style.width = `${(summary.goal_progress * 100).toFixed(1)}%`;
    };

    const markCell = (date, checked) => {
      const cell = document.querySelector(`button[data-date="${date}"]`);
      if (cell) {
        cell.classList.toggle('checked', checked);
      }
    };

    document.querySelectorAll('#days form').forEach((form) => {
      form.addEventListener('submit', async (event) => {
        event.preventDefault();
        const button = form.querySelector('button');
        const date = button.dataset.date;
        markCell(date, !button.classList.contains('checked'));
        try {
          const res = await fetch('/api/toggle', {
            method: 'POST',
            headers: { 'content-type': 'application/json' },
            body: JSON.stringify({ date })
          });
          if (res.ok) {
            const body = await res.json();
            markCell(body.date, body.checked);
            showSummary(body.summary);
          }
        } catch (_) {
          // The server keeps its own state; the next change or reload catches up.
        }
      });
    });

    if (live) {
      const events = new EventSource('/api/events');
      events.addEventListener('change', async (event) => {
        const change = JSON.parse(event.data);
        markCell(change.date, change.checked);
        const res = await fetch('/api/summary');
        if (res.ok) {
          showSummary(await res.json());
        }
      });
    }
  </script>
</body>
</html>
"#;
