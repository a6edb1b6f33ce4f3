use log::info;

use crate::sensors::Reading;

/// Character columns of the 1602 panel on the car board.
pub const LCD_COLS: usize = 16;
pub const LCD_ROWS: usize = 2;
/// Row that carries the sensor line; row 0 is the status banner.
pub const SENSOR_ROW: usize = 1;

pub const ERROR_LINE: &str = "DHT Error";

/// Consumer of the polling task. Calls are brief and made from the sensor task itself.
pub trait ReadingSink {
    fn show_reading(&mut self, reading: &Reading);

    /// Sustained failure; the previously shown reading is not cleared by the caller.
    fn show_error(&mut self);
}

/// Pad or cut `text` to exactly one display row so a shorter line overwrites a longer one.
pub fn fit_row(text: &str) -> String {
    let mut row: String = text.chars().take(LCD_COLS).collect();
    let len = row.chars().count();
    row.extend(std::iter::repeat(' ').take(LCD_COLS - len));
    row
}

/// Mirrors the two LCD rows and logs every change. The character display
/// driver itself is an external collaborator that reads [`LogDisplay::rows`].
#[derive(Debug, Clone)]
pub struct LogDisplay {
    rows: [String; LCD_ROWS],
}

impl Default for LogDisplay {
    fn default() -> Self {
        Self {
            rows: [fit_row(""), fit_row("")],
        }
    }
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&mut self, row: usize, text: &str) {
        let Some(slot) = self.rows.get_mut(row) else {
            return;
        };
        *slot = fit_row(text);
        info!("LCD[{}] {}", row, slot.trim_end());
    }

    pub fn rows(&self) -> &[String; LCD_ROWS] {
        &self.rows
    }
}

impl ReadingSink for LogDisplay {
    fn show_reading(&mut self, reading: &Reading) {
        self.print(SENSOR_ROW, &reading.to_string());
    }

    fn show_error(&mut self) {
        self.print(SENSOR_ROW, ERROR_LINE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_and_truncated() {
        assert_eq!(fit_row("DHT Error"), "DHT Error       ");
        assert_eq!(fit_row("T:-12.5C H:100.0%").len(), LCD_COLS);
        assert_eq!(fit_row("T:-12.5C H:100.0%"), "T:-12.5C H:100.0");
    }

    #[test]
    fn reading_lands_on_sensor_row() {
        let mut lcd = LogDisplay::new();
        lcd.print(0, "Car Board Ready");
        lcd.show_reading(&Reading::new(273, 652));
        assert_eq!(lcd.rows()[0].trim_end(), "Car Board Ready");
        assert_eq!(lcd.rows()[1].trim_end(), "T:27.3C H:65.2%");

        lcd.show_error();
        assert_eq!(lcd.rows()[1].trim_end(), ERROR_LINE);
    }

    #[test]
    fn out_of_bounds_row_is_ignored() {
        let mut lcd = LogDisplay::new();
        lcd.print(7, "nope");
        assert!(lcd.rows().iter().all(|r| r.trim().is_empty()));
    }
}
