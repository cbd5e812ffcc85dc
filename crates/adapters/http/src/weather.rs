//! Weather/clock CSV row parsing.

/// One parsed row of the hub's weather/clock template response:
/// `Temperature,Condition,Year,Month,Day,Weekday,Hour,Minute,Second`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRow {
    pub temperature_c: f32,
    pub condition: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: u8,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
}

impl WeatherRow {
    /// Parse the first data row below the header.
    ///
    /// The temperature must parse as a number or the whole row is rejected —
    /// there is no partial weather update. Missing trailing calendar fields
    /// default to zero, matching the hub's short-row behavior.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines().map(str::trim);
        // Header line.
        lines.next()?;
        let row = lines.find(|line| !line.is_empty())?;

        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            return None;
        }

        let temperature_c: f32 = fields[0].parse().ok()?;
        let condition = fields[1].to_string();

        let int_at = |index: usize| -> i64 {
            fields
                .get(index)
                .and_then(|field| field.parse().ok())
                .unwrap_or(0)
        };

        Some(Self {
            temperature_c,
            condition,
            year: int_at(2) as i32,
            month: int_at(3).max(0) as u32,
            day: int_at(4).max(0) as u32,
            weekday: int_at(5).clamp(0, 6) as u8,
            hour: int_at(6),
            minute: int_at(7),
            second: int_at(8),
        })
    }
}
