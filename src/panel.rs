use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::scene::{Align, Painter, Rect, Scene, Stroke};
use crate::signal::RedrawSignal;
use crate::Color;

pub const KEY_COLUMN_WIDTH: f64 = 80.0;
pub const ROW_HEIGHT: f64 = 20.0;
const CELL_PADDING: f64 = 4.0;
const FONT_SIZE: f32 = 8.0;

const KEY_COLOR: Color = Color::BLUE;
const VALUE_COLOR: Color = Color::BLACK;
const EVEN_ROW: Color = Color::WHITE;
const ODD_ROW: Color = Color::new(0xe0, 0xe0, 0xe0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRow {
    pub key: String,
    pub value: String,
}

/// Insertion-ordered string map with unique keys.
///
/// Updating an existing key keeps its position, so row indices stay stable
/// as long as no key is added or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryMap {
    rows: Vec<TelemetryRow>,
}

impl TelemetryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous value when `key` was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.rows[index].value, value)),
            None => {
                self.rows.push(TelemetryRow { key, value });
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|index| self.rows[index].value.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|index| self.rows.remove(index).value)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.key == key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TelemetryRow> {
        self.rows.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TelemetryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TelemetryMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a> IntoIterator for &'a TelemetryMap {
    type Item = &'a TelemetryRow;
    type IntoIter = std::slice::Iter<'a, TelemetryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Identity of a rendered row, fixed when the row is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub color: Color,
    pub background: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub id: RowId,
    pub key: Cell,
    pub value: Cell,
}

/// Exclusive access to the panel's data. Dropping the guard releases it.
pub type PanelDataGuard<'a> = MutexGuard<'a, TelemetryMap>;

/// Two-column live telemetry list.
///
/// The data map and the rendered rows sit behind separate locks. A refresh
/// holds the data lock for its whole duration, so an external writer holding
/// a [`PanelDataGuard`] and a refresh never interleave. Refreshing while the
/// same thread still holds a guard deadlocks; drop the guard first.
#[derive(Debug, Default)]
pub struct KeyValuePanel {
    data: Mutex<TelemetryMap>,
    rows: Mutex<Vec<PanelRow>>,
    next_row_id: AtomicU64,
    redraw: RedrawSignal,
}

impl KeyValuePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole mapping and refreshes.
    pub fn set_data(&self, data: TelemetryMap) {
        *self.data.lock() = data;
        self.refresh();
    }

    /// Locks the mapping for in-place edits. Call [`list_reload`] after the
    /// guard is dropped to show the changes.
    ///
    /// [`list_reload`]: KeyValuePanel::list_reload
    pub fn data(&self) -> PanelDataGuard<'_> {
        self.data.lock()
    }

    /// Scoped edit: the lock is held until the returned guard is dropped.
    pub fn begin_set_data(&self) -> PanelDataGuard<'_> {
        self.data.lock()
    }

    pub fn list_reload(&self) {
        self.refresh();
    }

    /// Syncs the rendered rows with the mapping. Existing rows keep their
    /// identity and colours and only get new text; missing rows are created,
    /// surplus rows dropped.
    pub fn refresh(&self) {
        let (created, total) = {
            let data = self.data.lock();
            let mut rows = self.rows.lock();

            rows.truncate(data.len());
            let mut created = 0;
            for (index, entry) in data.iter().enumerate() {
                match rows.get_mut(index) {
                    Some(row) => {
                        row.key.text.clone_from(&entry.key);
                        row.value.text.clone_from(&entry.value);
                    }
                    None => {
                        rows.push(self.new_row(index, entry));
                        created += 1;
                    }
                }
            }
            (created, rows.len())
        };

        debug!(rows = total, created, "panel refreshed");
        self.redraw.emit();
    }

    fn new_row(&self, index: usize, entry: &TelemetryRow) -> PanelRow {
        let background = if index % 2 == 0 { EVEN_ROW } else { ODD_ROW };
        PanelRow {
            id: RowId(self.next_row_id.fetch_add(1, Ordering::Relaxed)),
            key: Cell {
                text: entry.key.clone(),
                color: KEY_COLOR,
                background,
            },
            value: Cell {
                text: entry.value.clone(),
                color: VALUE_COLOR,
                background,
            },
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    /// Snapshot of the rendered rows.
    pub fn rows(&self) -> Vec<PanelRow> {
        self.rows.lock().clone()
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.lock().iter().map(|row| row.id).collect()
    }

    pub fn redraw_signal(&self) -> &RedrawSignal {
        &self.redraw
    }

    /// Lays the rendered rows out top-down in a panel `width` pixels wide.
    pub fn scene(&self, width: f64) -> Scene {
        let rows = self.rows.lock();
        let value_width = (width - KEY_COLUMN_WIDTH).max(0.0);

        let mut scene = Scene::new();
        {
            let mut painter = Painter::new(&mut scene);
            painter.set_font_size(FONT_SIZE);

            for (index, row) in rows.iter().enumerate() {
                let y = index as f64 * ROW_HEIGHT;

                painter.fill_rect(Rect::new(0.0, y, KEY_COLUMN_WIDTH, ROW_HEIGHT), row.key.background);
                painter.fill_rect(
                    Rect::new(KEY_COLUMN_WIDTH, y, value_width, ROW_HEIGHT),
                    row.value.background,
                );

                painter.set_pen(Some(Stroke::new(row.key.color, 1.0)));
                painter.draw_text(
                    Rect::new(CELL_PADDING, y, KEY_COLUMN_WIDTH - 2.0 * CELL_PADDING, ROW_HEIGHT),
                    Align::Left,
                    row.key.text.as_str(),
                );
                painter.set_pen(Some(Stroke::new(row.value.color, 1.0)));
                painter.draw_text(
                    Rect::new(
                        KEY_COLUMN_WIDTH + CELL_PADDING,
                        y,
                        (value_width - 2.0 * CELL_PADDING).max(0.0),
                        ROW_HEIGHT,
                    ),
                    Align::Left,
                    row.value.text.as_str(),
                );
            }
        }
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    fn map(pairs: &[(&str, &str)]) -> TelemetryMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn map_keeps_insertion_order() {
        let mut data = map(&[("roll", "0"), ("pitch", "0"), ("alt", "0")]);
        data.insert("pitch", "5");
        let keys: Vec<&str> = data.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, vec!["roll", "pitch", "alt"]);
        assert_eq!(data.get("pitch"), Some("5"));
    }

    #[test]
    fn map_insert_reports_previous_value() {
        let mut data = TelemetryMap::new();
        assert_eq!(data.insert("a", "1"), None);
        assert_eq!(data.insert("a", "2"), Some("1".to_string()));
        assert_eq!(data.len(), 1);
        assert_eq!(data.remove("a"), Some("2".to_string()));
        assert!(data.is_empty());
    }

    #[test]
    fn same_keys_update_rows_in_place() {
        let panel = KeyValuePanel::new();
        panel.set_data(map(&[("a", "1"), ("b", "2")]));
        let ids = panel.row_ids();

        panel.set_data(map(&[("a", "3"), ("b", "4")]));

        assert_eq!(panel.row_count(), 2);
        assert_eq!(panel.row_ids(), ids);
        let values: Vec<String> = panel.rows().into_iter().map(|row| row.value.text).collect();
        assert_eq!(values, vec!["3", "4"]);
    }

    #[test]
    fn rows_are_zebra_striped() {
        let panel = KeyValuePanel::new();
        panel.set_data(map(&[("a", "1"), ("b", "2"), ("c", "3")]));
        let backgrounds: Vec<Color> = panel
            .rows()
            .iter()
            .map(|row| row.key.background)
            .collect();
        assert_eq!(backgrounds, vec![EVEN_ROW, ODD_ROW, EVEN_ROW]);
        assert!(panel
            .rows()
            .iter()
            .all(|row| row.key.color == KEY_COLOR && row.value.color == VALUE_COLOR));
    }

    #[test]
    fn shrinking_drops_surplus_rows() {
        let panel = KeyValuePanel::new();
        panel.set_data(map(&[("a", "1"), ("b", "2"), ("c", "3")]));
        let first = panel.row_ids()[0];

        panel.set_data(map(&[("z", "9")]));

        assert_eq!(panel.row_count(), 1);
        assert_eq!(panel.row_ids(), vec![first]);
        assert_eq!(panel.rows()[0].key.text, "z");
    }

    #[test]
    fn guarded_edits_show_after_reload() {
        let panel = KeyValuePanel::new();
        panel.set_data(map(&[("a", "1")]));
        {
            let mut data = panel.begin_set_data();
            data.insert("a", "10");
            data.insert("b", "20");
        }
        assert_eq!(panel.row_count(), 1);

        panel.list_reload();
        assert_eq!(panel.row_count(), 2);
        assert_eq!(panel.rows()[1].value.text, "20");
    }

    #[test]
    fn every_refresh_requests_a_redraw() {
        let panel = KeyValuePanel::new();
        panel.list_reload();
        panel.list_reload();
        assert_eq!(panel.redraw_signal().emit_count(), 2);
    }

    #[test]
    fn external_writer_and_refresh_are_serialised() {
        let panel = Arc::new(KeyValuePanel::new());
        let writer = {
            let panel = panel.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let mut data = panel.begin_set_data();
                    data.clear();
                    data.insert("a", i.to_string());
                    data.insert("b", i.to_string());
                }
            })
        };
        for _ in 0..200 {
            panel.refresh();
            let rows = panel.rows();
            if rows.len() == 2 {
                assert_eq!(rows[0].value.text, rows[1].value.text);
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn scene_lays_out_two_columns() {
        let panel = KeyValuePanel::new();
        panel.set_data(map(&[("roll", "1"), ("pitch", "2")]));
        let scene = panel.scene(300.0);
        assert_eq!(scene.texts(), vec!["roll", "1", "pitch", "2"]);
        let second_row = scene.polygons()[2];
        assert_eq!(second_row[0].y, ROW_HEIGHT);
        assert_eq!(second_row[0].x, 0.0);
    }
}
