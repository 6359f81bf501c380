// 二维码生成工具
// 提供UPI支付二维码生成功能

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

/// 生成支付二维码
///
/// # Arguments
/// * `payment_url` - 支付链接 (如 upi://pay?pa=...&am=100)
///
/// # Returns
/// * Base64编码的PNG图片数据
pub fn generate_payment_qr_code(payment_url: &str) -> Result<String> {
    let png_data = render_qr_png(payment_url)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png_data)))
}

/// 渲染二维码为PNG字节
pub fn render_qr_png(content: &str) -> Result<Vec<u8>> {
    let qr_code = QrCode::new(content.as_bytes()).context("Failed to create QR code")?;

    let image = qr_code
        .render::<Luma<u8>>()
        .min_dimensions(256, 256)
        .build();

    let mut png_data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)
        .context("Failed to encode PNG")?;

    Ok(png_data)
}

/// 验证二维码内容是否为UPI支付链接
///
/// # Arguments
/// * `content` - 二维码内容
///
/// # Returns
/// * 内容是否为有效的UPI支付链接
pub fn validate_upi_qr_content(content: &str) -> bool {
    let Some((scheme, query)) = content.split_once('?') else {
        return false;
    };

    if !scheme.ends_with("://pay") && !scheme.ends_with("://upi/pay") {
        return false;
    }

    // 必须包含收款地址和金额
    let has_payee = url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| key == "pa" && value.contains('@'));
    let has_amount = url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| key == "am" && !value.is_empty());

    has_payee && has_amount
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_payment_qr_code() {
        let payment_url = "upi://pay?pa=donate%40oksbi&pn=Basava+Yuva+Brigade&am=100&cu=INR";
        let qr_code = generate_payment_qr_code(payment_url).unwrap();

        assert!(qr_code.starts_with("data:image/png;base64,"));
        assert!(qr_code.len() > 100);
    }

    #[test]
    fn test_render_qr_png_signature() {
        let png = render_qr_png("upi://pay?pa=donate%40oksbi&am=1").unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_validate_upi_qr_content() {
        assert!(validate_upi_qr_content("upi://pay?pa=donate%40oksbi&am=100&cu=INR"));
        assert!(validate_upi_qr_content("tez://upi/pay?pa=donate%40oksbi&am=5"));

        let invalid = vec![
            "https://example.com",
            "upi://pay?pn=Someone&am=100",
            "upi://pay?pa=donate%40oksbi",
            "upi://pay",
        ];
        for content in invalid {
            assert!(!validate_upi_qr_content(content), "content should be invalid: {}", content);
        }
    }
}
