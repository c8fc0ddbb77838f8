use alto_core::ConversationController;
use tracing::debug;

/// The input box grows with its content up to this many text lines
pub const MAX_INPUT_LINES: u16 = 6;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub controller: ConversationController,
    pub endpoint: String,

    // Composer state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Transcript view state
    pub scroll: u16,
    pub follow: bool, // stick to the newest message
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(controller: ConversationController, endpoint: &str) -> Self {
        Self {
            should_quit: false,
            controller,
            endpoint: endpoint.to_string(),
            input: String::new(),
            cursor: 0,
            scroll: 0,
            follow: true,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Send is offered only for non-blank input while idle
    pub fn can_send(&self) -> bool {
        !self.is_busy() && !self.input.trim().is_empty()
    }

    /// Hand the composed text to the controller and reset the composer.
    ///
    /// Blank input or a pending reply leaves everything as it is.
    pub fn send(&mut self) {
        if !self.can_send() {
            return;
        }

        if self.controller.submit(&self.input).is_some() {
            debug!(chars = self.input.chars().count(), "message sent");
            self.input.clear();
            self.cursor = 0;
            self.follow = true;
        }
    }

    // Composer editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    /// Move to the start of the current input line
    pub fn cursor_home(&mut self) {
        let (_, col) = self.cursor_row_col();
        self.cursor -= col;
    }

    /// Move to the end of the current input line
    pub fn cursor_end(&mut self) {
        let rest = self.input.chars().skip(self.cursor).take_while(|&c| c != '\n').count();
        self.cursor += rest;
    }

    /// Row and column of the cursor within the (possibly multi-line) input
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let before = self.input.chars().take(self.cursor);
        let mut row = 0;
        let mut col = 0;
        for c in before {
            if c == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (row, col)
    }

    pub fn input_line_count(&self) -> usize {
        self.input.split('\n').count()
    }

    /// Visible text rows of the input box
    pub fn input_height(&self) -> u16 {
        (self.input_line_count() as u16).clamp(1, MAX_INPUT_LINES)
    }

    // Transcript scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow = true;
    }

    /// Clamp the scroll offset to the rendered transcript and follow the
    /// bottom when asked to. Called from render with the current content.
    pub fn sync_scroll(&mut self, total_lines: u16) {
        let max_scroll = total_lines.saturating_sub(self.chat_height);
        if self.follow || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow = true;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
