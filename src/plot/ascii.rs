//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - sampled curve: `-` line
//! - computed points: `o`
//!
//! Either axis can be logarithmic; points that are not positive on a log
//! axis are left out.

/// Axis labels and scales of a plot.
#[derive(Debug, Clone, Copy)]
pub struct PlotAxes<'a> {
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub log_x: bool,
    pub log_y: bool,
}

impl PlotAxes<'_> {
    fn to_plot(&self, (x, y): (f64, f64)) -> Option<(f64, f64)> {
        let x = if self.log_x { positive_log10(x)? } else { x };
        let y = if self.log_y { positive_log10(y)? } else { y };
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }
}

fn positive_log10(v: f64) -> Option<f64> {
    (v > 0.0).then(|| v.log10())
}

fn from_plot(v: f64, log: bool) -> f64 {
    if log { 10f64.powf(v) } else { v }
}

/// Render `curve` as a line with `points` overlaid.
pub fn render_ascii_plot(
    curve: &[(f64, f64)],
    points: &[(f64, f64)],
    axes: PlotAxes<'_>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let curve: Vec<(f64, f64)> = curve.iter().filter_map(|&p| axes.to_plot(p)).collect();
    let points: Vec<(f64, f64)> = points.iter().filter_map(|&p| axes.to_plot(p)).collect();

    let (x_min, x_max) = range(curve.iter().chain(&points).map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(curve.iter().chain(&points).map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);
    for &(x, y) in &points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}=[{:.3e}, {:.3e}]{} | {}=[{:.3e}, {:.3e}]{}\n",
        axes.x_label,
        from_plot(x_min, axes.log_x),
        from_plot(x_max, axes.log_x),
        if axes.log_x { " log" } else { "" },
        axes.y_label,
        from_plot(y_min, axes.log_y),
        from_plot(y_max, axes.log_y),
        if axes.log_y { " log" } else { "" },
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else if min.is_finite() && min == max {
        Some((min - 0.5, max + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
