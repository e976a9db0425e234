use anyhow::Result;
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// One compact JSON document per line, for event streams.
pub fn render_json_lines<T: Serialize>(items: &[T]) -> Result<String> {
    let lines = items
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shuffle::ShuffleEvent;

    #[test]
    fn json_lines_are_compact() {
        let events = vec![
            ShuffleEvent::ShuffleStarted {
                animation_id: "a1".to_string(),
            },
            ShuffleEvent::Completed {
                animation_id: "a1".to_string(),
            },
        ];
        let out = render_json_lines(&events).expect("json");
        assert_eq!(
            out,
            "{\"event\":\"shuffle_started\",\"animation_id\":\"a1\"}\n{\"event\":\"completed\",\"animation_id\":\"a1\"}"
        );
    }
}
