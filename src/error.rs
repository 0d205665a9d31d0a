pub type LinelessResult<T> = Result<T, LinelessError>;

#[derive(thiserror::Error, Debug)]
pub enum LinelessError {
    #[error(
        "dimension mismatch: stroke is {stroke_width}x{stroke_height}, color is {color_width}x{color_height}"
    )]
    DimensionMismatch {
        stroke_width: u32,
        stroke_height: u32,
        color_width: u32,
        color_height: u32,
    },

    #[error(
        "size mismatch: base is {base_width}x{base_height}, overlay is {overlay_width}x{overlay_height}"
    )]
    SizeMismatch {
        base_width: u32,
        base_height: u32,
        overlay_width: u32,
        overlay_height: u32,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("grid has no pixels")]
    EmptyGrid,

    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LinelessError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn invalid_color(msg: impl Into<String>) -> Self {
        Self::InvalidColor(msg.into())
    }
}
