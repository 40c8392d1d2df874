//! Image geometry rules: resolution bounds and channel count.

use serde::Deserialize;

use crate::error::{Result, SluiceError};
use crate::frame::{ColumnType, Expr};

use super::{ColumnRef, Matcher, Rule};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ResolutionConfig {
    min_res: i64,
    max_res: i64,
    crop: bool,
    scale: i64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            min_res: 0,
            max_res: 2048,
            crop: false,
            scale: 4,
        }
    }
}

/// Bounds the image resolution: the smaller dimension must reach `min_res`
/// and the larger must not exceed `max_res`. A bound of zero is disabled.
///
/// With `crop` set, dimensions are first snapped down to a multiple of
/// `scale`, matching an output stage that crops to a scale-divisible grid.
#[derive(Debug)]
pub struct ResolutionRule {
    min_res: i64,
    max_res: i64,
    crop: bool,
    scale: i64,
}

impl ResolutionRule {
    pub const NAME: &'static str = "resolution";

    pub fn new(min_res: i64, max_res: i64, crop: bool, scale: i64) -> Result<Self> {
        if min_res == 0 && max_res == 0 {
            return Err(SluiceError::Config(
                "resolution: both bounds are disabled".to_string(),
            ));
        }
        if min_res < 0 || max_res < 0 {
            return Err(SluiceError::Config(
                "resolution: bounds must be non-negative".to_string(),
            ));
        }
        if max_res != 0 && min_res > max_res {
            return Err(SluiceError::Config(format!(
                "resolution: min_res ({}) exceeds max_res ({})",
                min_res, max_res
            )));
        }
        if crop && scale <= 0 {
            return Err(SluiceError::Config(
                "resolution: scale must be positive when crop is set".to_string(),
            ));
        }
        Ok(Self {
            min_res,
            max_res,
            crop,
            scale,
        })
    }

    pub fn from_config(params: &serde_json::Value) -> Result<Box<dyn Rule>> {
        let config: ResolutionConfig = serde_json::from_value(params.clone())
            .map_err(|e| SluiceError::Config(format!("resolution: {}", e)))?;
        Ok(Box::new(Self::new(
            config.min_res,
            config.max_res,
            config.crop,
            config.scale,
        )?))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({ "min_res": 0, "max_res": 2048, "crop": false, "scale": 4 })
    }

    fn snapped(&self, dim: Expr) -> Expr {
        if self.crop {
            dim.floor_div(Expr::lit(self.scale)).mul(Expr::lit(self.scale))
        } else {
            dim
        }
    }
}

impl Rule for ResolutionRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn requires(&self) -> Vec<ColumnRef> {
        vec![
            ColumnRef::new("width", ColumnType::Int),
            ColumnRef::new("height", ColumnType::Int),
        ]
    }

    fn matcher(&self) -> Matcher {
        let smallest = Expr::min_horizontal(vec![Expr::col("width"), Expr::col("height")]);
        let largest = Expr::max_horizontal(vec![Expr::col("width"), Expr::col("height")]);

        let mut exprs = Vec::new();
        if self.min_res > 0 {
            exprs.push(self.snapped(smallest).ge(Expr::lit(self.min_res)));
        }
        if self.max_res > 0 {
            exprs.push(self.snapped(largest).le(Expr::lit(self.max_res)));
        }
        // The constructor guarantees at least one bound.
        Matcher::Fast(Expr::all(exprs).unwrap_or_else(|_| Expr::lit(true)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ChannelConfig {
    min_channels: i64,
    max_channels: i64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            min_channels: 1,
            max_channels: 4,
        }
    }
}

/// Bounds the number of color channels.
#[derive(Debug)]
pub struct ChannelRule {
    min_channels: i64,
    max_channels: i64,
}

impl ChannelRule {
    pub const NAME: &'static str = "channels";

    pub fn new(min_channels: i64, max_channels: i64) -> Result<Self> {
        if min_channels < 1 || max_channels < min_channels {
            return Err(SluiceError::Config(format!(
                "channels: invalid range {}..={}",
                min_channels, max_channels
            )));
        }
        Ok(Self {
            min_channels,
            max_channels,
        })
    }

    pub fn from_config(params: &serde_json::Value) -> Result<Box<dyn Rule>> {
        let config: ChannelConfig = serde_json::from_value(params.clone())
            .map_err(|e| SluiceError::Config(format!("channels: {}", e)))?;
        Ok(Box::new(Self::new(config.min_channels, config.max_channels)?))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({ "min_channels": 1, "max_channels": 4 })
    }
}

impl Rule for ChannelRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn requires(&self) -> Vec<ColumnRef> {
        vec![ColumnRef::new("channels", ColumnType::Int)]
    }

    fn matcher(&self) -> Matcher {
        Matcher::Fast(
            Expr::lit(self.min_channels)
                .le(Expr::col("channels"))
                .and(Expr::col("channels").le(Expr::lit(self.max_channels))),
        )
    }
}
