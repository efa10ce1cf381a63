//! Click patterns built on top of the automation facade.

use rand::Rng;
use tracing::debug;

use crate::automation::{Automation, Click, ClickDrag};
use crate::error::{AhkError, Result};
use crate::geometry::{Point, Region};

pub const DEFAULT_GAP: u32 = 5;
pub const DEFAULT_DELAY: u32 = 2;

/// Grid points `gap` pixels apart covering the region, edges included.
///
/// Rows run top to bottom, left to right within a row; `reverse` starts at
/// the bottom-right instead.
pub fn box_points(region: Region, gap: u32, reverse: bool) -> Result<Vec<Point>> {
    if gap == 0 {
        return Err(AhkError::invalid_command("clickBox", "gap must be positive"));
    }
    let step = f64::from(gap);
    let mut points = Vec::new();
    let mut y = region.y1;
    while y <= region.y2 {
        let mut x = region.x1;
        while x <= region.x2 {
            points.push(Point::new(x, y));
            x += step;
        }
        y += step;
    }
    if reverse {
        points.reverse();
    }
    Ok(points)
}

/// A uniformly random whole-pixel point inside the region, edges included.
pub fn random_point<R: Rng>(region: Region, rng: &mut R) -> Point {
    let x = between(region.x1, region.x2, rng);
    let y = between(region.y1, region.y2, rng);
    Point::new(x, y)
}

fn between<R: Rng>(a: f64, b: f64, rng: &mut R) -> f64 {
    let (lo, hi) = (a.min(b).floor() as i64, a.max(b).floor() as i64);
    rng.gen_range(lo..=hi) as f64
}

/// The point `distance` pixels from `origin` at `angle` degrees, rounded.
///
/// Angles follow screen coordinates: 90 degrees points down.
pub fn circle_point(origin: Point, angle: f64, distance: f64) -> Point {
    let radians = angle.to_radians();
    Point::new(
        (radians.cos() * distance + origin.x).round(),
        (radians.sin() * distance + origin.y).round(),
    )
}

/// Click every grid point of the region in order.
pub async fn click_box(
    automation: &Automation,
    region: Region,
    gap: Option<u32>,
    delay: Option<u32>,
    reverse: bool,
) -> Result<()> {
    let points = box_points(region, gap.unwrap_or(DEFAULT_GAP), reverse)?;
    debug!(clicks = points.len(), reverse, "clicking box");
    for point in points {
        automation
            .click(Click::at(point).delay(delay.unwrap_or(DEFAULT_DELAY)))
            .await?;
    }
    Ok(())
}

/// Click `count` random points inside the region.
pub async fn rand_click_box(
    automation: &Automation,
    region: Region,
    delay: Option<u32>,
    count: u32,
) -> Result<()> {
    for _ in 0..count {
        let point = random_point(region, &mut rand::thread_rng());
        automation
            .click(Click::at(point).delay(delay.unwrap_or(DEFAULT_DELAY)))
            .await?;
    }
    Ok(())
}

/// Drag from `origin` to the point `distance` pixels away at `angle` degrees.
pub async fn click_drag_circle(
    automation: &Automation,
    origin: Point,
    angle: f64,
    distance: f64,
    speed: Option<u32>,
) -> Result<()> {
    let mut drag = ClickDrag::new(origin, circle_point(origin, angle, distance));
    drag.speed = speed;
    automation.mouse_click_drag(drag).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_box_points_cover_region_inclusive() {
        let region = Region::new(0.0, 0.0, 10.0, 5.0);
        let points = box_points(region, 5, false).unwrap();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], Point::new(0.0, 0.0));
        assert_eq!(points[2], Point::new(10.0, 0.0));
        assert_eq!(points[5], Point::new(10.0, 5.0));
        assert!(points.iter().all(|p| region.contains(*p)));
    }

    #[test]
    fn test_box_points_reverse() {
        let region = Region::new(0.0, 0.0, 10.0, 5.0);
        let points = box_points(region, 5, true).unwrap();
        assert_eq!(points[0], Point::new(10.0, 5.0));
        assert_eq!(points[5], Point::new(0.0, 0.0));
    }

    #[test]
    fn test_box_points_single_point_and_zero_gap() {
        let region = Region::new(3.0, 4.0, 3.0, 4.0);
        assert_eq!(box_points(region, 5, false).unwrap(), vec![Point::new(3.0, 4.0)]);
        assert!(box_points(region, 0, false).is_err());
    }

    #[test]
    fn test_random_point_inside_region() {
        let mut rng = StdRng::seed_from_u64(7);
        let region = Region::new(10.0, 20.0, 15.0, 22.0);
        for _ in 0..200 {
            assert!(region.contains(random_point(region, &mut rng)));
        }
    }

    #[test]
    fn test_circle_point() {
        let origin = Point::new(100.0, 100.0);
        assert_eq!(circle_point(origin, 0.0, 50.0), Point::new(150.0, 100.0));
        assert_eq!(circle_point(origin, 90.0, 50.0), Point::new(100.0, 150.0));
        assert_eq!(circle_point(origin, 180.0, 10.0), Point::new(90.0, 100.0));
    }
}
