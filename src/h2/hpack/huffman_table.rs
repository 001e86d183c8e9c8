//! RFC 7541 Appendix B Huffman code table: (code, length-in-bits) per
//! symbol 0..=255, plus the EOS symbol at index 256. Verified to form a
//! complete prefix code (Kraft's inequality sums to exactly 1).

pub const EOS: usize = 256;

pub static CODES: [(u32, u8); 257] = [
    (8184u32, 13u8),
    (8388568u32, 23u8),
    (268435426u32, 28u8),
    (268435427u32, 28u8),
    (268435428u32, 28u8),
    (268435429u32, 28u8),
    (268435430u32, 28u8),
    (268435431u32, 28u8),
    (268435432u32, 28u8),
    (16777194u32, 24u8),
    (1073741820u32, 30u8),
    (268435433u32, 28u8),
    (268435434u32, 28u8),
    (1073741821u32, 30u8),
    (268435435u32, 28u8),
    (268435436u32, 28u8),
    (268435437u32, 28u8),
    (268435438u32, 28u8),
    (268435439u32, 28u8),
    (268435440u32, 28u8),
    (268435441u32, 28u8),
    (268435442u32, 28u8),
    (1073741822u32, 30u8),
    (268435443u32, 28u8),
    (268435444u32, 28u8),
    (268435445u32, 28u8),
    (268435446u32, 28u8),
    (268435447u32, 28u8),
    (268435448u32, 28u8),
    (268435449u32, 28u8),
    (268435450u32, 28u8),
    (268435451u32, 28u8),
    (20u32, 6u8),
    (1016u32, 10u8),
    (1017u32, 10u8),
    (4090u32, 12u8),
    (8185u32, 13u8),
    (21u32, 6u8),
    (248u32, 8u8),
    (2042u32, 11u8),
    (1018u32, 10u8),
    (1019u32, 10u8),
    (249u32, 8u8),
    (2043u32, 11u8),
    (250u32, 8u8),
    (22u32, 6u8),
    (23u32, 6u8),
    (24u32, 6u8),
    (0u32, 5u8),
    (1u32, 5u8),
    (2u32, 5u8),
    (25u32, 6u8),
    (26u32, 6u8),
    (27u32, 6u8),
    (28u32, 6u8),
    (29u32, 6u8),
    (30u32, 6u8),
    (31u32, 6u8),
    (92u32, 7u8),
    (251u32, 8u8),
    (32764u32, 15u8),
    (32u32, 6u8),
    (4091u32, 12u8),
    (1020u32, 10u8),
    (8186u32, 13u8),
    (33u32, 6u8),
    (93u32, 7u8),
    (94u32, 7u8),
    (95u32, 7u8),
    (96u32, 7u8),
    (97u32, 7u8),
    (98u32, 7u8),
    (99u32, 7u8),
    (100u32, 7u8),
    (101u32, 7u8),
    (102u32, 7u8),
    (103u32, 7u8),
    (104u32, 7u8),
    (105u32, 7u8),
    (106u32, 7u8),
    (107u32, 7u8),
    (108u32, 7u8),
    (109u32, 7u8),
    (110u32, 7u8),
    (111u32, 7u8),
    (112u32, 7u8),
    (113u32, 7u8),
    (114u32, 7u8),
    (252u32, 8u8),
    (115u32, 7u8),
    (253u32, 8u8),
    (8187u32, 13u8),
    (524272u32, 19u8),
    (8188u32, 13u8),
    (16380u32, 14u8),
    (34u32, 6u8),
    (32765u32, 15u8),
    (3u32, 5u8),
    (35u32, 6u8),
    (4u32, 5u8),
    (36u32, 6u8),
    (5u32, 5u8),
    (37u32, 6u8),
    (38u32, 6u8),
    (39u32, 6u8),
    (6u32, 5u8),
    (116u32, 7u8),
    (117u32, 7u8),
    (40u32, 6u8),
    (41u32, 6u8),
    (42u32, 6u8),
    (7u32, 5u8),
    (43u32, 6u8),
    (118u32, 7u8),
    (44u32, 6u8),
    (8u32, 5u8),
    (9u32, 5u8),
    (45u32, 6u8),
    (119u32, 7u8),
    (120u32, 7u8),
    (121u32, 7u8),
    (122u32, 7u8),
    (123u32, 7u8),
    (32766u32, 15u8),
    (2044u32, 11u8),
    (16381u32, 14u8),
    (8189u32, 13u8),
    (268435452u32, 28u8),
    (1048550u32, 20u8),
    (4194258u32, 22u8),
    (1048551u32, 20u8),
    (1048552u32, 20u8),
    (4194259u32, 22u8),
    (4194260u32, 22u8),
    (4194261u32, 22u8),
    (8388569u32, 23u8),
    (4194262u32, 22u8),
    (8388570u32, 23u8),
    (8388571u32, 23u8),
    (8388572u32, 23u8),
    (8388573u32, 23u8),
    (8388574u32, 23u8),
    (16777195u32, 24u8),
    (8388575u32, 23u8),
    (16777196u32, 24u8),
    (16777197u32, 24u8),
    (4194263u32, 22u8),
    (8388576u32, 23u8),
    (16777198u32, 24u8),
    (8388577u32, 23u8),
    (8388578u32, 23u8),
    (8388579u32, 23u8),
    (8388580u32, 23u8),
    (2097116u32, 21u8),
    (4194264u32, 22u8),
    (8388581u32, 23u8),
    (4194265u32, 22u8),
    (8388582u32, 23u8),
    (8388583u32, 23u8),
    (16777199u32, 24u8),
    (4194266u32, 22u8),
    (2097117u32, 21u8),
    (1048553u32, 20u8),
    (4194267u32, 22u8),
    (4194268u32, 22u8),
    (8388584u32, 23u8),
    (8388585u32, 23u8),
    (2097118u32, 21u8),
    (8388586u32, 23u8),
    (4194269u32, 22u8),
    (4194270u32, 22u8),
    (16777200u32, 24u8),
    (2097119u32, 21u8),
    (4194271u32, 22u8),
    (8388587u32, 23u8),
    (8388588u32, 23u8),
    (2097120u32, 21u8),
    (2097121u32, 21u8),
    (4194272u32, 22u8),
    (2097122u32, 21u8),
    (8388589u32, 23u8),
    (4194273u32, 22u8),
    (8388590u32, 23u8),
    (8388591u32, 23u8),
    (1048554u32, 20u8),
    (4194274u32, 22u8),
    (4194275u32, 22u8),
    (4194276u32, 22u8),
    (8388592u32, 23u8),
    (4194277u32, 22u8),
    (4194278u32, 22u8),
    (8388593u32, 23u8),
    (67108832u32, 26u8),
    (67108833u32, 26u8),
    (1048555u32, 20u8),
    (524273u32, 19u8),
    (4194279u32, 22u8),
    (8388594u32, 23u8),
    (4194280u32, 22u8),
    (33554412u32, 25u8),
    (67108834u32, 26u8),
    (67108835u32, 26u8),
    (67108836u32, 26u8),
    (134217694u32, 27u8),
    (134217695u32, 27u8),
    (67108837u32, 26u8),
    (16777201u32, 24u8),
    (33554413u32, 25u8),
    (524274u32, 19u8),
    (2097123u32, 21u8),
    (67108838u32, 26u8),
    (134217696u32, 27u8),
    (134217697u32, 27u8),
    (67108839u32, 26u8),
    (134217698u32, 27u8),
    (16777202u32, 24u8),
    (2097124u32, 21u8),
    (2097125u32, 21u8),
    (67108840u32, 26u8),
    (67108841u32, 26u8),
    (268435453u32, 28u8),
    (134217699u32, 27u8),
    (134217700u32, 27u8),
    (134217701u32, 27u8),
    (1048556u32, 20u8),
    (16777203u32, 24u8),
    (1048557u32, 20u8),
    (2097126u32, 21u8),
    (4194281u32, 22u8),
    (2097127u32, 21u8),
    (2097128u32, 21u8),
    (8388595u32, 23u8),
    (4194282u32, 22u8),
    (4194283u32, 22u8),
    (33554414u32, 25u8),
    (33554415u32, 25u8),
    (16777204u32, 24u8),
    (16777205u32, 24u8),
    (67108842u32, 26u8),
    (8388596u32, 23u8),
    (67108843u32, 26u8),
    (134217702u32, 27u8),
    (67108844u32, 26u8),
    (67108845u32, 26u8),
    (134217703u32, 27u8),
    (134217704u32, 27u8),
    (134217705u32, 27u8),
    (134217706u32, 27u8),
    (134217707u32, 27u8),
    (268435454u32, 28u8),
    (134217708u32, 27u8),
    (134217709u32, 27u8),
    (134217710u32, 27u8),
    (134217711u32, 27u8),
    (134217712u32, 27u8),
    (67108846u32, 26u8),
    (1073741823u32, 30u8),
];
