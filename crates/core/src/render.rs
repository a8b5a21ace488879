use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::label::CellLabels;
use crate::model::*;

/// Identity of an on-screen cell across render passes: the node name plus
/// the occurrence count of that name among the leaves already emitted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub name: String,
    pub ordinal: u32,
}

/// View model for one visible leaf. Rebuilt on every pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderCell {
    pub key: CellKey,
    pub node: NodeRef,
    pub name: String,
    pub value: f64,
    pub depth: u32,
    /// Position in the current leaf ordering.
    pub index: usize,
    /// Layout tile in canvas coordinates.
    pub rect: Rect,
    /// The tile minus the inner padding gap.
    pub draw_rect: Rect,
    pub color: Rgba,
    pub labels: CellLabels,
    pub matched: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub stagger_ms: u64,
    /// Upper bound for the whole staggered cascade.
    pub stagger_budget_ms: u64,
    pub enter_ms: u64,
    pub update_ms: u64,
    pub exit_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            stagger_ms: 20,
            stagger_budget_ms: 600,
            enter_ms: 300,
            update_ms: 300,
            exit_ms: 200,
        }
    }
}

impl AnimationConfig {
    /// Entrance delay of the cell at `index` out of `count`. The per-cell
    /// step shrinks so the last delay never exceeds the budget.
    pub fn stagger_delay(&self, index: usize, count: usize) -> Duration {
        if count == 0 {
            return Duration::ZERO;
        }
        let step_ms = (self.stagger_ms as f64).min(self.stagger_budget_ms as f64 / count as f64);
        let step_nanos = (step_ms * 1_000_000.0).round() as u64;
        Duration::from_nanos(step_nanos.saturating_mul(index as u64))
    }

    fn duration(&self, phase: Phase) -> Duration {
        let ms = match phase {
            Phase::Entering => self.enter_ms,
            Phase::Updating => self.update_ms,
            Phase::Exiting => self.exit_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Entering,
    Updating,
    Exiting,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub entered: Vec<CellKey>,
    pub updated: Vec<CellKey>,
    pub exited: Vec<CellKey>,
}

/// Interpolated state of one cell at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct CellFrame<'a> {
    pub cell: &'a RenderCell,
    pub rect: Rect,
    pub opacity: f64,
    pub phase: Phase,
}

#[derive(Clone, Debug)]
struct Tracked {
    cell: RenderCell,
    phase: Phase,
    from: Rect,
    from_opacity: f64,
    started: Duration,
    delay: Duration,
}

impl Tracked {
    fn progress(&self, now: Duration, anim: &AnimationConfig) -> f64 {
        let duration = anim.duration(self.phase);
        let elapsed = now.saturating_sub(self.started).saturating_sub(self.delay);
        if duration.is_zero() {
            return 1.0;
        }
        ease_out_cubic((elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
    }

    fn sample(&self, now: Duration, anim: &AnimationConfig) -> (Rect, f64) {
        let t = self.progress(now, anim);
        match self.phase {
            Phase::Entering | Phase::Updating => (
                self.from.lerp(&self.cell.draw_rect, t),
                self.from_opacity + (1.0 - self.from_opacity) * t,
            ),
            Phase::Exiting => (self.from, self.from_opacity * (1.0 - t)),
        }
    }

    fn is_done(&self, now: Duration, anim: &AnimationConfig) -> bool {
        now.saturating_sub(self.started) >= self.delay + anim.duration(self.phase)
    }
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Retained set of cells, reconciled against each render pass by key so
/// surviving cells animate from where they are instead of being recreated.
#[derive(Debug, Default)]
pub struct Scene {
    animation: AnimationConfig,
    cells: Vec<Tracked>,
    index: HashMap<CellKey, usize>,
}

impl Scene {
    pub fn new(animation: AnimationConfig) -> Self {
        Self {
            animation,
            ..Self::default()
        }
    }

    pub fn set_animation(&mut self, animation: AnimationConfig) {
        self.animation = animation;
    }

    /// Enter/update/exit pass. `next` must be in leaf order.
    pub fn reconcile(&mut self, next: Vec<RenderCell>, now: Duration) -> Reconciliation {
        let anim = self.animation;
        let mut diff = Reconciliation::default();
        let mut previous: HashMap<CellKey, Tracked> = self
            .cells
            .drain(..)
            .map(|t| (t.cell.key.clone(), t))
            .collect();
        let count = next.len();
        let mut cells = Vec::with_capacity(count + previous.len());

        for cell in next {
            let tracked = match previous.remove(&cell.key) {
                // Same target: the running animation carries on untouched.
                Some(mut prev)
                    if prev.phase != Phase::Exiting && prev.cell.draw_rect == cell.draw_rect =>
                {
                    diff.updated.push(cell.key.clone());
                    prev.cell = cell;
                    prev
                }
                Some(prev) => {
                    let (from, from_opacity) = prev.sample(now, &anim);
                    diff.updated.push(cell.key.clone());
                    Tracked {
                        phase: Phase::Updating,
                        from,
                        from_opacity,
                        started: now,
                        delay: Duration::ZERO,
                        cell,
                    }
                }
                None => {
                    diff.entered.push(cell.key.clone());
                    Tracked {
                        phase: Phase::Entering,
                        from: cell.draw_rect.scale_about_center(0.6),
                        from_opacity: 0.0,
                        started: now,
                        delay: anim.stagger_delay(cell.index, count),
                        cell,
                    }
                }
            };
            cells.push(tracked);
        }

        let mut leaving: Vec<Tracked> = previous.into_values().collect();
        leaving.sort_by_key(|t| t.cell.index);
        for prev in leaving {
            if prev.phase == Phase::Exiting {
                if !prev.is_done(now, &anim) {
                    cells.push(prev);
                }
                continue;
            }
            let (from, from_opacity) = prev.sample(now, &anim);
            diff.exited.push(prev.cell.key.clone());
            cells.push(Tracked {
                phase: Phase::Exiting,
                from,
                from_opacity,
                started: now,
                delay: Duration::ZERO,
                cell: prev.cell,
            });
        }

        self.cells = cells;
        self.reindex();
        diff
    }

    /// Drops exit animations that have finished.
    pub fn prune(&mut self, now: Duration) {
        let anim = self.animation;
        let before = self.cells.len();
        self.cells
            .retain(|t| t.phase != Phase::Exiting || !t.is_done(now, &anim));
        if self.cells.len() != before {
            self.reindex();
        }
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        self.cells.iter().any(|t| !t.is_done(now, &self.animation))
    }

    /// Frames to draw, exiting cells first so live cells paint over them.
    pub fn frames(&self, now: Duration) -> Vec<CellFrame<'_>> {
        let mut frames: Vec<CellFrame<'_>> = self
            .cells
            .iter()
            .map(|t| {
                let (rect, opacity) = t.sample(now, &self.animation);
                CellFrame {
                    cell: &t.cell,
                    rect,
                    opacity,
                    phase: t.phase,
                }
            })
            .collect();
        frames.sort_by_key(|f| f.phase != Phase::Exiting);
        frames
    }

    /// Live cells in leaf order.
    pub fn cells(&self) -> impl Iterator<Item = &RenderCell> + '_ {
        self.cells
            .iter()
            .filter(|t| t.phase != Phase::Exiting)
            .map(|t| &t.cell)
    }

    pub fn get(&self, key: &CellKey) -> Option<&RenderCell> {
        let t = &self.cells[*self.index.get(key)?];
        (t.phase != Phase::Exiting).then_some(&t.cell)
    }

    pub fn hit_test(&self, p: Point) -> Option<&RenderCell> {
        self.cells().find(|c| c.draw_rect.contains(p))
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.index.clear();
    }

    fn reindex(&mut self) {
        self.index = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, t)| (t.cell.key.clone(), i))
            .collect();
    }
}

/// Assigns keys to leaves in order, numbering repeated names.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    seen: HashMap<String, u32>,
}

impl KeyAllocator {
    pub fn key(&mut self, name: &str) -> CellKey {
        let ordinal = self.seen.entry(name.to_string()).or_insert(0);
        let key = CellKey {
            name: name.to_string(),
            ordinal: *ordinal,
        };
        *ordinal += 1;
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(name: &str, index: usize, rect: Rect) -> RenderCell {
        RenderCell {
            key: CellKey {
                name: name.to_string(),
                ordinal: 0,
            },
            node: NodeRef {
                generation: 1,
                id: NodeId(index as u64 + 1),
            },
            name: name.to_string(),
            value: 1.0,
            depth: 1,
            index,
            rect,
            draw_rect: rect,
            color: Rgba::WHITE,
            labels: CellLabels::default(),
            matched: false,
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn stagger_is_bounded_by_budget() {
        let anim = AnimationConfig::default();
        assert_eq!(anim.stagger_delay(3, 10), ms(60));
        let last = anim.stagger_delay(9_999, 10_000);
        assert!(last <= ms(anim.stagger_budget_ms));
    }

    #[test]
    fn enter_update_exit() {
        let mut scene = Scene::new(AnimationConfig::default());
        let a = Rect::new(0.0, 0.0, 50.0, 50.0);
        let b = Rect::new(50.0, 0.0, 100.0, 50.0);
        let diff = scene.reconcile(vec![cell("a", 0, a), cell("b", 1, b)], Duration::ZERO);
        assert_eq!(diff.entered.len(), 2);

        let wide = Rect::new(0.0, 0.0, 100.0, 50.0);
        let diff = scene.reconcile(vec![cell("a", 0, wide)], ms(1_000));
        assert_eq!(diff.updated, vec![CellKey { name: "a".into(), ordinal: 0 }]);
        assert_eq!(diff.exited, vec![CellKey { name: "b".into(), ordinal: 0 }]);
        assert_eq!(scene.cells().count(), 1);

        // Updated cells move from where they were.
        let frames = scene.frames(ms(1_000));
        let a_frame = frames.iter().find(|f| f.cell.name == "a").unwrap();
        assert_eq!(a_frame.rect, a);
        let settled = scene.frames(ms(2_000));
        let a_frame = settled.iter().find(|f| f.cell.name == "a").unwrap();
        assert_eq!(a_frame.rect, wide);

        scene.prune(ms(2_000));
        assert_eq!(scene.frames(ms(2_000)).len(), 1);
        assert!(!scene.is_animating(ms(2_000)));
    }

    #[test]
    fn entrance_is_staggered() {
        let mut scene = Scene::new(AnimationConfig::default());
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        scene.reconcile(vec![cell("a", 0, r), cell("b", 1, r), cell("c", 2, r)], Duration::ZERO);
        let frames = scene.frames(ms(10));
        let opacity = |n: &str| frames.iter().find(|f| f.cell.name == n).unwrap().opacity;
        assert!(opacity("a") > 0.0);
        assert_eq!(opacity("c"), 0.0);
    }

    #[test]
    fn unchanged_cells_keep_their_entrance() {
        let mut scene = Scene::new(AnimationConfig::default());
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let cells = || vec![cell("a", 0, r), cell("b", 1, r), cell("c", 2, r)];
        scene.reconcile(cells(), Duration::ZERO);

        let mut next = cells();
        next[2].matched = true;
        let diff = scene.reconcile(next, ms(10));
        assert_eq!(diff.updated.len(), 3);

        let frames = scene.frames(ms(10));
        let c = frames.iter().find(|f| f.cell.name == "c").unwrap();
        assert_eq!(c.phase, Phase::Entering);
        assert_eq!(c.opacity, 0.0);
        assert!(c.cell.matched);
    }

    #[test]
    fn hit_test_skips_the_padding_gap() {
        let mut scene = Scene::new(AnimationConfig::default());
        let mut a = cell("a", 0, Rect::new(0.0, 0.0, 20.0, 20.0));
        a.draw_rect = a.rect.inset(2.0);
        scene.reconcile(vec![a], Duration::ZERO);
        assert!(scene.hit_test(Point::new(1.0, 1.0)).is_none());
        assert_eq!(scene.hit_test(Point::new(10.0, 10.0)).map(|c| c.name.as_str()), Some("a"));
    }

    #[test]
    fn hit_test_ignores_exiting_cells() {
        let mut scene = Scene::new(AnimationConfig::default());
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        scene.reconcile(vec![cell("a", 0, r)], Duration::ZERO);
        assert_eq!(scene.hit_test(Point::new(5.0, 5.0)).map(|c| c.name.as_str()), Some("a"));
        scene.reconcile(vec![], ms(10));
        assert!(scene.hit_test(Point::new(5.0, 5.0)).is_none());
        assert!(scene.get(&CellKey { name: "a".into(), ordinal: 0 }).is_none());
    }

    #[test]
    fn duplicate_names_get_ordinals() {
        let mut keys = KeyAllocator::default();
        assert_eq!(keys.key("x").ordinal, 0);
        assert_eq!(keys.key("y").ordinal, 0);
        assert_eq!(keys.key("x").ordinal, 1);
    }
}
