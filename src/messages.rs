//! User-facing fallback messages, used when the server does not send its own.

pub const STATS_FAILED: &str = "Không thể tải thống kê báo cáo";
pub const LIST_FAILED: &str = "Không thể tải danh sách báo cáo";
pub const DETAIL_FAILED: &str = "Không thể tải chi tiết báo cáo";
pub const APPROVE_FAILED: &str = "Không thể duyệt báo cáo";
pub const REJECT_FAILED: &str = "Không thể từ chối báo cáo";
pub const TEACHERS_FAILED: &str = "Không thể tải danh sách giáo viên chưa nộp báo cáo";
pub const COMPANIES_FAILED: &str = "Không thể tải danh sách doanh nghiệp chưa nộp báo cáo";
pub const EXPORT_FAILED: &str = "Không thể xuất báo cáo";
pub const DOWNLOAD_FAILED: &str = "Không thể lưu tệp xuất báo cáo";
pub const SESSION_EXPIRED: &str = "Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại";
