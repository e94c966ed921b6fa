//! Terminal stand-ins for the keypad and display.

use std::io::Write;

use async_trait::async_trait;
use latchkey_core::hal::{Display, Key, Keypad, KeypadError};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Keypad fed by a byte stream, one key per byte.
///
/// Newline counts as Enter, so typing `12345` and pressing return submits a
/// passcode.
#[derive(Debug)]
pub struct ReaderKeypad<R> {
    reader: R,
}

impl<R> ReaderKeypad<R> {
    /// Keys from `reader`.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> Keypad for ReaderKeypad<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_key(&mut self) -> Result<Key, KeypadError> {
        match self.reader.read_u8().await {
            Ok(byte) => Ok(Key::from_char(char::from(byte))),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(KeypadError::Closed),
            Err(err) => Err(err.into()),
        }
    }
}

/// Display rendered onto a text writer.
#[derive(Debug)]
pub struct TextDisplay<W> {
    out: W,
}

impl<W> TextDisplay<W> {
    /// Render onto `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TextDisplay<W> {
    fn render(&mut self, text: std::fmt::Arguments<'_>) {
        if let Err(err) = self.out.write_fmt(text).and_then(|()| self.out.flush()) {
            tracing::warn!(%err, "display write failed");
        }
    }
}

impl<W: Write + Send> Display for TextDisplay<W> {
    fn show(&mut self, text: &str) {
        self.render(format_args!("\n----------------\n{text}\n"));
    }

    fn echo(&mut self, ch: char) {
        self.render(format_args!("{ch}"));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use latchkey_proto::Digit;

    use super::*;

    #[tokio::test]
    async fn keys_from_bytes() {
        let mut keypad = ReaderKeypad::new(&b"4+\n"[..]);
        assert_eq!(keypad.read_key().await.unwrap(), Key::Digit(Digit::new(4).unwrap()));
        assert_eq!(keypad.read_key().await.unwrap(), Key::Plus);
        assert_eq!(keypad.read_key().await.unwrap(), Key::Enter);
        assert!(matches!(keypad.read_key().await, Err(KeypadError::Closed)));
    }

    #[test]
    fn renders_screens_and_echo() {
        let mut display = TextDisplay::new(Vec::new());
        display.show("Enter Pass:");
        display.echo('*');
        display.echo('*');

        let rendered = String::from_utf8(display.into_inner()).unwrap();
        assert!(rendered.ends_with("Enter Pass:\n**"));
    }
}
