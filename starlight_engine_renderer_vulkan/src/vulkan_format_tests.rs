//! Unit tests for Vulkan format and flag conversion functions
//!
//! Pure conversions, no GPU required.

use super::*;

// ============================================================================
// TEXTURE FORMAT CONVERSION TESTS
// ============================================================================

#[test]
fn test_format_to_vk_color_formats() {
    assert_eq!(format_to_vk(TextureFormat::R8_UNORM), vk::Format::R8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
}

#[test]
fn test_format_to_vk_float_formats() {
    assert_eq!(format_to_vk(TextureFormat::R16G16B16A16_SFLOAT), vk::Format::R16G16B16A16_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32_SFLOAT), vk::Format::R32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32B32A32_SFLOAT), vk::Format::R32G32B32A32_SFLOAT);
}

// ============================================================================
// USAGE FLAG CONVERSION TESTS
// ============================================================================

#[test]
fn test_buffer_usage_staging() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::TRANSFER_SRC), vk::BufferUsageFlags::TRANSFER_SRC);
}

#[test]
fn test_buffer_usage_combined() {
    let flags = buffer_usage_to_vk(BufferUsage::VERTEX | BufferUsage::INDEX | BufferUsage::TRANSFER_DST);

    assert!(flags.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    assert!(flags.contains(vk::BufferUsageFlags::INDEX_BUFFER));
    assert!(flags.contains(vk::BufferUsageFlags::TRANSFER_DST));
    assert!(!flags.contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
}

#[test]
fn test_buffer_usage_empty() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::empty()), vk::BufferUsageFlags::empty());
}

#[test]
fn test_texture_usage_always_transfer_dst() {
    let flags = texture_usage_to_vk(TextureUsage::SAMPLED);

    assert!(flags.contains(vk::ImageUsageFlags::SAMPLED));
    assert!(flags.contains(vk::ImageUsageFlags::TRANSFER_DST));
    assert!(!flags.contains(vk::ImageUsageFlags::STORAGE));
}

#[test]
fn test_texture_usage_storage() {
    let flags = texture_usage_to_vk(TextureUsage::STORAGE | TextureUsage::TRANSFER_SRC);

    assert!(flags.contains(vk::ImageUsageFlags::STORAGE));
    assert!(flags.contains(vk::ImageUsageFlags::TRANSFER_SRC));
}

#[test]
fn test_memory_location_mapping() {
    assert_eq!(memory_location_to_allocator(MemoryLocation::CpuToGpu), gpu_allocator::MemoryLocation::CpuToGpu);
    assert_eq!(memory_location_to_allocator(MemoryLocation::GpuOnly), gpu_allocator::MemoryLocation::GpuOnly);
    assert_eq!(memory_location_to_allocator(MemoryLocation::GpuToCpu), gpu_allocator::MemoryLocation::GpuToCpu);
}
