//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a freshly collected file
//! - deterministic output (helpful for golden tests)
//!
//! Each cumulative series is drawn as a line against the day index. Series
//! drawn earlier win where lines overlap.

use crate::domain::{Metric, Observation};

fn marker(metric: Metric) -> char {
    match metric {
        Metric::Infected => 'i',
        Metric::Cured => 'c',
        Metric::Deaths => 'd',
    }
}

/// Plot infected / cured / deaths against the day index.
pub fn render_series_plot(observations: &[Observation], width: usize, height: usize) -> String {
    let width = width.max(5);
    let height = height.max(3);

    let series: Vec<(char, Vec<f64>)> = Metric::ALL
        .iter()
        .map(|&m| (marker(m), observations.iter().map(|o| o.metric(m) as f64).collect()))
        .collect();

    let x_max = observations.len().saturating_sub(1).max(1) as f64;
    let (data_min, data_max) = y_range(&series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(data_min, data_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for (ch, values) in &series {
        let points: Vec<(usize, usize)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (map_x(i as f64, x_max, width), map_y(v, y_min, y_max, height)))
            .collect();
        draw_series(&mut grid, &points, *ch);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: day=[0, {}] | count=[{data_min}, {data_max}]\n",
        observations.len().saturating_sub(1)
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    let legend: Vec<String> = Metric::ALL
        .iter()
        .map(|&m| format!("{}={}", marker(m), m.column_name()))
        .collect();
    out.push_str(&format!("Legend: {}\n", legend.join(" ")));

    out
}

fn y_range(series: &[(char, Vec<f64>)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (_, values) in series {
        for &v in values {
            min_y = min_y.min(v);
            max_y = max_y.max(v);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_max: f64, width: usize) -> usize {
    let u = (x / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], points: &[(usize, usize)], ch: char) {
    match points {
        [] => {}
        [(x, y)] => {
            if grid[*y][*x] == ' ' {
                grid[*y][*x] = ch;
            }
        }
        _ => {
            for pair in points.windows(2) {
                let (x0, y0) = pair[0];
                let (x1, y1) = pair[1];
                draw_line(grid, x0, y0, x1, y1, ch);
            }
        }
    }
}

/// Integer line drawing (Bresenham-ish). Only fills blank cells.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_golden_snapshot_small() {
        let obs = vec![Observation::new(20200510, 0, 0, 0), Observation::new(20200511, 10, 0, 0)];

        let txt = render_series_plot(&obs, 5, 3);
        let expected = concat!(
            "Plot: day=[0, 1] | count=[0, 10]\n",
            "   ii\n",
            " ii  \n",
            "icccc\n",
            "Legend: i=infected c=cured d=deaths\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn single_row_does_not_panic() {
        let txt = render_series_plot(&[Observation::new(20200510, 5, 1, 0)], 20, 6);
        assert_eq!(txt.lines().count(), 1 + 6 + 1);
        assert!(txt.contains('i'));
    }
}
