use std::io::Write;

/// Line-oriented destination for trace output and `print`.
pub trait TraceSink {
    fn line(&mut self, text: &str);
}

impl TraceSink for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

/// Adapts any writer. Write failures are logged and otherwise ignored.
pub struct WriteSink<W: Write>(pub W);

impl<W: Write> TraceSink for WriteSink<W> {
    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.0, "{text}") {
            log::warn!("trace sink write failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_sink_terminates_lines() {
        let mut sink = WriteSink(Vec::new());
        sink.line("a");
        sink.line("b");
        assert_eq!(String::from_utf8(sink.0).unwrap(), "a\nb\n");
    }
}
