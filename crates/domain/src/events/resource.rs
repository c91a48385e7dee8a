//! 资源类型与其事件名的显式映射
//!
//! 每种资源固定对应三个事件名：全量/单项更新、新建、删除。
//! 映射在编译期写死，避免运行时字符串拼接。

use serde::{Deserialize, Serialize};

/// 可同步的资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// 房源
    Listing,
    /// 预订
    Booking,
    /// 举报
    Report,
}

impl ResourceKind {
    /// 全部资源类型
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Listing,
        ResourceKind::Booking,
        ResourceKind::Report,
    ];

    /// 资源标签
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Listing => "listing",
            ResourceKind::Booking => "booking",
            ResourceKind::Report => "report",
        }
    }

    /// 全量替换 / 单项更新事件名
    pub fn update_event(&self) -> &'static str {
        match self {
            ResourceKind::Listing => "listingUpdate",
            ResourceKind::Booking => "bookingUpdate",
            ResourceKind::Report => "reportUpdate",
        }
    }

    /// 新建事件名
    pub fn created_event(&self) -> &'static str {
        match self {
            ResourceKind::Listing => "newListing",
            ResourceKind::Booking => "newBooking",
            ResourceKind::Report => "newReport",
        }
    }

    /// 删除事件名
    pub fn deleted_event(&self) -> &'static str {
        match self {
            ResourceKind::Listing => "deleteListing",
            ResourceKind::Booking => "deleteBooking",
            ResourceKind::Report => "deleteReport",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
